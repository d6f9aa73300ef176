//! Solution extraction.
//!
//! Turns the solver's flat 0/1 assignment into the round → activity →
//! teams table. The per-team, per-round uniqueness check is a hard
//! assertion: a failure means the constraint set or the backend is broken.

use super::solution::Solution;
use crate::cp::{Assignment, VarIndex};
use crate::error::ExtractionError;

/// Extracts the schedule encoded by `assignment`.
///
/// Teams are listed in ascending order within each activity, so extracting
/// the same assignment twice gives identical output.
///
/// # Errors
///
/// - [`ExtractionError::LengthMismatch`] if the assignment does not cover
///   the index.
/// - [`ExtractionError::NonBoolean`] for a value other than 0 or 1.
/// - [`ExtractionError::AmbiguousActivity`] if a team has zero or several
///   activities in some round.
pub fn extract(index: &VarIndex, assignment: &Assignment) -> Result<Solution, ExtractionError> {
    if assignment.len() != index.len() {
        return Err(ExtractionError::LengthMismatch {
            expected: index.len(),
            actual: assignment.len(),
        });
    }

    let rounds = index.rounds();
    let mut table = vec![vec![Vec::new(); index.activities()]; rounds];

    for team in 0..index.teams() {
        for (round, groups) in table.iter_mut().enumerate() {
            let mut active = Vec::with_capacity(1);
            for (activity, var) in index.cell(team, round).enumerate() {
                match assignment.value(var) {
                    0 => {}
                    1 => active.push(activity),
                    value => {
                        return Err(ExtractionError::NonBoolean {
                            team,
                            round,
                            activity,
                            value,
                        })
                    }
                }
            }
            match active.as_slice() {
                [activity] => groups[*activity].push(team),
                _ => {
                    return Err(ExtractionError::AmbiguousActivity {
                        team,
                        round,
                        active,
                    })
                }
            }
        }
    }

    Ok(Solution::new(table))
}
