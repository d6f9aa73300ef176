//! The rotation schedule model.
//!
//! Assigns `T` teams to `R` rounds of `R` activities so that every team
//! visits every activity once, every activity holds `C = T / R` teams per
//! round, and no two teams meet more than a fixed number of times outside
//! the no-conflict activity.
//!
//! # Components
//!
//! - [`RotationParams`] / [`MeetingPolicy`]: validated problem parameters
//! - [`ModelBuilder`]: emits the CP model
//! - [`SymmetryBreaking`]: canonical pins and group ordering
//! - [`extract`]: assignment → [`Solution`]
//! - [`validate_solution`]: independent schedule check
//! - [`Scheduler`]: build → solve → extract → verify

mod builder;
mod extract;
mod params;
mod scheduler;
mod solution;
mod symmetry;
mod validation;

pub use builder::ModelBuilder;
pub use extract::extract;
pub use params::{Exemption, MeetingPolicy, RotationParams};
pub use scheduler::{Outcome, Scheduler};
pub use solution::Solution;
pub use symmetry::SymmetryBreaking;
pub use validation::{
    validate_pins, validate_solution, ValidationError, ValidationErrorKind, ValidationResult,
};
