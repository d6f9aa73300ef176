//! CP solver interface.
//!
//! A solver is an oracle: given a [`CpModel`] it returns a satisfying
//! [`Assignment`], proves that none exists, or stops with a
//! [`SolverFault`]. The model builder and the solution extractor never
//! depend on a particular backend.

use super::model::CpModel;
use super::variables::Assignment;
use crate::error::SolverFault;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What the solver decided.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// A total assignment satisfying every constraint.
    Satisfiable(Assignment),
    /// No assignment satisfies the constraints.
    Unsatisfiable,
    /// The solver stopped without an answer.
    Fault(SolverFault),
}

impl SolveOutcome {
    /// Short status label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            SolveOutcome::Satisfiable(_) => "sat",
            SolveOutcome::Unsatisfiable => "unsat",
            SolveOutcome::Fault(_) => "fault",
        }
    }

    /// Whether a satisfying assignment was found.
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, SolveOutcome::Satisfiable(_))
    }
}

/// Search statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
    /// Search nodes (exact search) or move evaluations (local search).
    pub nodes: u64,
    /// Wall time spent in the solver.
    pub elapsed: Duration,
    /// Annealing runs started (local search only).
    pub restarts: usize,
}

impl fmt::Display for SolveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes in {:.3}s",
            self.nodes,
            self.elapsed.as_secs_f64()
        )?;
        if self.restarts > 0 {
            write!(f, ", {} restart(s)", self.restarts)?;
        }
        Ok(())
    }
}

/// Outcome plus statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub outcome: SolveOutcome,
    pub stats: SolveStats,
}

/// Resource limits for one solve call.
///
/// # Examples
///
/// ```
/// use u_rotation::cp::SolveLimits;
/// use std::time::Duration;
///
/// let limits = SolveLimits::default()
///     .with_time_limit(Duration::from_secs(30))
///     .with_node_limit(1_000_000);
/// assert_eq!(limits.node_limit, Some(1_000_000));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SolveLimits {
    /// Wall-time budget.
    pub time_limit: Option<Duration>,
    /// Node (or iteration) budget.
    pub node_limit: Option<u64>,
    /// External cancellation flag.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SolveLimits {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Starts the clock for a solve call.
    pub fn start(&self) -> Budget<'_> {
        Budget {
            limits: self,
            started: Instant::now(),
        }
    }
}

/// A running budget created by [`SolveLimits::start`].
#[derive(Debug)]
pub struct Budget<'a> {
    limits: &'a SolveLimits,
    started: Instant,
}

impl Budget<'_> {
    /// Time since the budget started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns the fault to stop with, if any limit is exhausted.
    ///
    /// Cancellation wins over time, time over nodes.
    pub fn exhausted(&self, nodes: u64) -> Option<SolverFault> {
        if let Some(ref flag) = self.limits.cancel {
            if flag.load(Ordering::Relaxed) {
                return Some(SolverFault::Cancelled);
            }
        }
        if let Some(limit) = self.limits.time_limit {
            let elapsed = self.elapsed();
            if elapsed >= limit {
                return Some(SolverFault::Timeout { elapsed });
            }
        }
        if let Some(limit) = self.limits.node_limit {
            if nodes >= limit {
                return Some(SolverFault::NodeLimit { nodes });
            }
        }
        None
    }
}

/// Trait for CP solver implementations.
///
/// Implementors provide the actual constraint solving logic. A backend may
/// wrap an external SAT/ILP engine (every constraint lowers to
/// pseudo-boolean form) or search directly.
pub trait CpSolver {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Solves the model.
    fn solve(&self, model: &CpModel, limits: &SolveLimits) -> SolveReport;
}
