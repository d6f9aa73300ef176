//! Solver backends.
//!
//! - [`BacktrackingSolver`]: exact depth-first search, proves infeasibility
//! - [`AnnealingSolver`]: tabu-guided simulated annealing with restarts,
//!   finds schedules but never proves that none exists

mod annealing;
mod backtracking;
mod plan;

pub use annealing::AnnealingSolver;
pub use backtracking::BacktrackingSolver;
