//! Constraint Programming (CP) layer.
//!
//! Provides a backend-neutral model of the rotation problem over 0/1
//! assignment variables, and the solver interface backends implement.
//!
//! # Key Components
//!
//! - **Variables**: [`Var`], [`VarIndex`], [`Assignment`]: the dense
//!   `x[team][round][activity]` container and its values
//! - **Constraints**: [`Constraint`]: one-per-round, visit-once, capacity,
//!   meeting limit, pins and lexicographic ordering
//! - **Model**: [`CpModel`]: variable index plus constraint list
//! - **Solver**: [`CpSolver`] trait: SAT / UNSAT / fault oracle
//!
//! # Design
//!
//! Constraints lower to pseudo-boolean form ([`PbConstraint`]) so the model
//! can be handed to any SAT/ILP engine. The backends in
//! [`search`](crate::search) read the same constraints directly.
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod model;
mod solver;
mod variables;

pub use model::{Constraint, ConstraintKind, CpModel, PbConstraint, Relation, Term};
pub use solver::{Budget, CpSolver, SolveLimits, SolveOutcome, SolveReport, SolveStats};
pub use variables::{ActivityId, Assignment, RoundId, TeamId, Var, VarIndex};
