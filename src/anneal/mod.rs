//! Simulated Annealing (SA).
//!
//! A single-solution trajectory metaheuristic inspired by the physical
//! annealing process. Accepts worsening moves with a probability that
//! decreases over time (temperature), allowing the search to escape
//! local optima.
//!
//! Moves are evaluated incrementally: a problem proposes a move, prices it
//! against the current state and applies it only when accepted, so large
//! states are never cloned per iteration.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"

mod config;
mod runner;
mod types;

pub use config::AnnealConfig;
pub use runner::{AnnealResult, AnnealRunner};
pub use types::AnnealProblem;
