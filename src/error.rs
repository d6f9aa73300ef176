//! Error types for u-rotation.
//!
//! An infeasible instance is not an error: the scheduler reports it as
//! [`Outcome::Infeasible`](crate::rotation::Outcome::Infeasible). The types
//! here cover invalid input, solver faults and broken solver output.

use crate::cp::{ActivityId, RoundId, TeamId};
use crate::rotation::ValidationError;
use std::time::Duration;
use thiserror::Error;

/// Invalid parameters or run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The solver stopped without deciding satisfiability.
///
/// Distinct from infeasibility: a fault says nothing about whether a
/// schedule exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverFault {
    /// The time budget ran out.
    #[error("solver did not finish within {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// The node or iteration budget ran out.
    #[error("solver gave up after {nodes} nodes")]
    NodeLimit { nodes: u64 },

    /// The cancellation flag was raised.
    #[error("solver was cancelled")]
    Cancelled,

    /// A stochastic backend exhausted its restarts without reaching zero
    /// violations.
    #[error("local search did not converge after {restarts} restart(s), best cost {best_cost}")]
    NotConverged { restarts: usize, best_cost: usize },

    /// The backend misbehaved (unsupported model, wrong answer).
    #[error("internal solver error: {0}")]
    Internal(String),
}

/// The solver's assignment does not describe a schedule.
///
/// Always a modelling or backend bug; never recoverable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("assignment has {actual} values, model has {expected} variables")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("variable for team {team}, round {round}, activity {activity} is {value}, not 0/1")]
    NonBoolean {
        team: TeamId,
        round: RoundId,
        activity: ActivityId,
        value: u8,
    },

    #[error("team {team} has {} activities in round {round}: {active:?}", .active.len())]
    AmbiguousActivity {
        team: TeamId,
        round: RoundId,
        active: Vec<ActivityId>,
    },

    #[error("extracted schedule is invalid ({} violation(s)); first: {}", .0.len(), .0.first().map(|e| e.message.as_str()).unwrap_or("-"))]
    InvalidSolution(Vec<ValidationError>),
}

/// Main error type for u-rotation operations.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Solver(#[from] SolverFault),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for u-rotation operations.
pub type Result<T> = std::result::Result<T, RotationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::ValidationErrorKind;

    #[test]
    fn test_fault_messages() {
        let timeout = SolverFault::Timeout {
            elapsed: Duration::from_secs(3),
        };
        assert_eq!(timeout.to_string(), "solver did not finish within 3s");
        assert_eq!(
            SolverFault::NodeLimit { nodes: 10 }.to_string(),
            "solver gave up after 10 nodes"
        );
    }

    #[test]
    fn test_extraction_messages() {
        let err = ExtractionError::AmbiguousActivity {
            team: 4,
            round: 2,
            active: vec![1, 3],
        };
        assert_eq!(err.to_string(), "team 4 has 2 activities in round 2: [1, 3]");

        let err = ExtractionError::InvalidSolution(vec![ValidationError {
            kind: ValidationErrorKind::RepeatedVisit,
            message: "team 1 visits activity 0 twice".into(),
        }]);
        assert!(err.to_string().contains("team 1 visits activity 0 twice"));
    }

    #[test]
    fn test_rotation_error_from() {
        let err: RotationError = SolverFault::Cancelled.into();
        assert!(matches!(err, RotationError::Solver(SolverFault::Cancelled)));
        assert_eq!(err.to_string(), "solver was cancelled");

        let err: RotationError = ConfigError::Invalid("teams must be positive".into()).into();
        assert_eq!(err.to_string(), "Invalid configuration: teams must be positive");
    }
}
