//! End-to-end scheduling: build, solve, extract, verify.

use super::builder::ModelBuilder;
use super::extract::extract;
use super::params::RotationParams;
use super::solution::Solution;
use super::symmetry::SymmetryBreaking;
use super::validation::{validate_pins, validate_solution};
use crate::cp::{CpSolver, SolveLimits, SolveOutcome, SolveStats};
use crate::error::{ConfigError, ExtractionError, Result};
use tracing::{info, warn};

/// Result of a scheduling run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A valid schedule was found.
    Scheduled { solution: Solution, stats: SolveStats },
    /// The solver proved that no schedule exists.
    Infeasible { stats: SolveStats },
}

impl Outcome {
    /// Search statistics of the run.
    pub fn stats(&self) -> &SolveStats {
        match self {
            Outcome::Scheduled { stats, .. } | Outcome::Infeasible { stats } => stats,
        }
    }

    /// The schedule, if one was found.
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Outcome::Scheduled { solution, .. } => Some(solution),
            Outcome::Infeasible { .. } => None,
        }
    }
}

/// Orchestrates one scheduling run.
///
/// # Examples
///
/// ```
/// use u_rotation::cp::SolveLimits;
/// use u_rotation::rotation::{Outcome, RotationParams, Scheduler};
/// use u_rotation::search::BacktrackingSolver;
///
/// let params = RotationParams::new(8, 4, 2).unwrap();
/// let outcome = Scheduler::new(params)
///     .schedule(&BacktrackingSolver::new(), &SolveLimits::default())
///     .unwrap();
///
/// let solution = outcome.solution().unwrap();
/// assert_eq!(solution.round_count(), 4);
/// assert_eq!(solution.teams_at(0, 0), &[0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct Scheduler {
    params: RotationParams,
    symmetry: SymmetryBreaking,
}

impl Scheduler {
    /// Creates a scheduler with all symmetry breaking enabled.
    pub fn new(params: RotationParams) -> Self {
        Self {
            params,
            symmetry: SymmetryBreaking::default(),
        }
    }

    pub fn with_symmetry(mut self, symmetry: SymmetryBreaking) -> Self {
        self.symmetry = symmetry;
        self
    }

    pub fn params(&self) -> &RotationParams {
        &self.params
    }

    /// Builds the model, solves it and returns a verified schedule.
    ///
    /// # Errors
    ///
    /// - [`RotationError::Solver`](crate::error::RotationError::Solver) if
    ///   the solver stops without an answer.
    /// - [`RotationError::Extraction`](crate::error::RotationError::Extraction)
    ///   if the assignment does not decode to a valid schedule.
    pub fn schedule<S: CpSolver + ?Sized>(
        &self,
        solver: &S,
        limits: &SolveLimits,
    ) -> Result<Outcome> {
        let model = ModelBuilder::new(&self.params)
            .with_symmetry(self.symmetry)
            .build();
        model.validate().map_err(ConfigError::Invalid)?;

        info!(
            event = "solve_start",
            solver = solver.name(),
            teams = self.params.teams(),
            activities = self.params.activities(),
            capacity = self.params.capacity(),
        );

        let report = solver.solve(&model, limits);

        info!(
            event = "solve_end",
            solver = solver.name(),
            status = report.outcome.label(),
            nodes = report.stats.nodes,
            restarts = report.stats.restarts,
            duration_ms = report.stats.elapsed.as_millis() as u64,
        );

        match report.outcome {
            SolveOutcome::Satisfiable(assignment) => {
                let solution = extract(&model.index, &assignment)?;
                let checked = validate_solution(&solution, &self.params)
                    .and_then(|()| validate_pins(&solution, &self.params, &self.symmetry));
                if let Err(errors) = checked {
                    return Err(ExtractionError::InvalidSolution(errors).into());
                }
                Ok(Outcome::Scheduled {
                    solution,
                    stats: report.stats,
                })
            }
            SolveOutcome::Unsatisfiable => {
                warn!(event = "infeasible", solver = solver.name());
                Ok(Outcome::Infeasible {
                    stats: report.stats,
                })
            }
            SolveOutcome::Fault(fault) => Err(fault.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{Assignment, CpModel, SolveReport};
    use crate::error::{RotationError, SolverFault};
    use crate::rotation::params::{Exemption, MeetingPolicy};
    use crate::rotation::validation::ValidationErrorKind;
    use crate::search::BacktrackingSolver;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    /// Returns a fixed outcome regardless of the model.
    struct Canned(SolveOutcome);

    impl CpSolver for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn solve(&self, _model: &CpModel, _limits: &SolveLimits) -> SolveReport {
            SolveReport {
                outcome: self.0.clone(),
                stats: SolveStats::default(),
            }
        }
    }

    // ---- exact backend ----

    #[test]
    fn test_reference_instance_scheduled() {
        let params = RotationParams::new(24, 6, 4).unwrap();
        let outcome = Scheduler::new(params)
            .schedule(&BacktrackingSolver::new(), &SolveLimits::default())
            .unwrap();

        let solution = outcome.solution().unwrap();
        assert!(validate_solution(solution, &params).is_ok());
        for team in 0..24 {
            assert_eq!(solution.activity_of(team, 0), Some(team / 4));
        }
        for round in 0..6 {
            assert_eq!(solution.activity_of(0, round), Some(round));
        }
    }

    #[test]
    fn test_strict_policy_infeasible() {
        let params = RotationParams::new(8, 4, 2)
            .unwrap()
            .with_meeting_policy(
                MeetingPolicy::default()
                    .with_limit(0)
                    .with_exemption(Exemption::None),
            )
            .unwrap();
        let outcome = Scheduler::new(params)
            .schedule(&BacktrackingSolver::new(), &SolveLimits::default())
            .unwrap();
        assert!(matches!(outcome, Outcome::Infeasible { .. }));
    }

    #[test]
    fn test_nine_teams_infeasible() {
        let params = RotationParams::new(9, 3, 3).unwrap();
        let outcome = Scheduler::new(params)
            .schedule(&BacktrackingSolver::new(), &SolveLimits::default())
            .unwrap();
        assert!(outcome.solution().is_none());
    }

    #[test]
    fn test_cancelled() {
        let params = RotationParams::new(24, 6, 4).unwrap();
        let limits = SolveLimits::default().with_cancel(Arc::new(AtomicBool::new(true)));
        let err = Scheduler::new(params)
            .schedule(&BacktrackingSolver::new(), &limits)
            .unwrap_err();
        assert!(matches!(err, RotationError::Solver(SolverFault::Cancelled)));
    }

    // ---- solver output guards ----

    #[test]
    fn test_fault_propagates() {
        let params = RotationParams::new(4, 2, 2).unwrap();
        let solver = Canned(SolveOutcome::Fault(SolverFault::NodeLimit { nodes: 5 }));
        let err = Scheduler::new(params)
            .schedule(&solver, &SolveLimits::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RotationError::Solver(SolverFault::NodeLimit { nodes: 5 })
        ));
    }

    #[test]
    fn test_bad_assignment_rejected() {
        let params = RotationParams::new(4, 2, 2).unwrap();
        let solver = Canned(SolveOutcome::Satisfiable(Assignment::zeros(16)));
        let err = Scheduler::new(params)
            .schedule(&solver, &SolveLimits::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RotationError::Extraction(ExtractionError::AmbiguousActivity { team: 0, round: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_schedule_rejected() {
        // Well-formed one-hot rows that repeat activity 0.
        let params = RotationParams::new(4, 2, 2).unwrap();
        let index = crate::cp::VarIndex::new(4, 2);
        let rows = vec![vec![0, 0], vec![0, 0], vec![1, 1], vec![1, 1]];
        let solver = Canned(SolveOutcome::Satisfiable(Assignment::from_itineraries(
            &index, &rows,
        )));
        let err = Scheduler::new(params)
            .schedule(&solver, &SolveLimits::default())
            .unwrap_err();
        match err {
            RotationError::Extraction(ExtractionError::InvalidSolution(errors)) => {
                assert!(errors
                    .iter()
                    .any(|e| e.kind == ValidationErrorKind::RepeatedVisit));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
