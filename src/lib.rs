//! Team rotation scheduling.
//!
//! Assigns `T` teams to `R` timed rounds of `R` activities such that:
//!
//! - every team visits every activity exactly once,
//! - every activity holds `C = T / R` teams in every round,
//! - no two teams share an activity more than once, except at a designated
//!   no-conflict activity (a break).
//!
//! This is a "social golfer" style design problem. The crate finds *a*
//! feasible schedule or proves that none exists; it does not optimise.
//!
//! # Modules
//!
//! - [`cp`]: solver-agnostic 0/1 constraint model and the [`cp::CpSolver`]
//!   oracle interface
//! - [`rotation`]: parameters, model builder, symmetry breaking, solution
//!   extraction, validation and the end-to-end [`rotation::Scheduler`]
//! - [`search`]: exact backtracking and simulated-annealing backends
//! - [`anneal`]: generic simulated annealing runner
//! - [`config`]: TOML run configuration
//! - [`render`]: plain-text timetable
//!
//! # Examples
//!
//! ```
//! use u_rotation::cp::SolveLimits;
//! use u_rotation::rotation::{validate_solution, RotationParams, Scheduler};
//! use u_rotation::search::BacktrackingSolver;
//!
//! let params = RotationParams::new(12, 4, 3).unwrap();
//! let outcome = Scheduler::new(params)
//!     .schedule(&BacktrackingSolver::new(), &SolveLimits::default())
//!     .unwrap();
//!
//! let solution = outcome.solution().unwrap();
//! assert!(validate_solution(solution, &params).is_ok());
//! ```

pub mod anneal;
pub mod config;
pub mod cp;
pub mod error;
pub mod render;
pub mod rotation;
pub mod search;

pub use error::{ConfigError, ExtractionError, Result, RotationError, SolverFault};
