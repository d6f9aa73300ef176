//! Schedule validation.
//!
//! Re-checks a [`Solution`] against the rotation rules without looking at
//! the model that produced it. Used as the scheduler's final guard and to
//! audit schedules loaded from JSON. Detects:
//! - Wrong round / activity / group counts
//! - Unknown, duplicated or missing teams within a round
//! - Repeated or missing activity visits
//! - Pairs meeting more often than the meeting policy allows
//! - Broken symmetry pins

use super::params::RotationParams;
use super::solution::Solution;
use super::symmetry::SymmetryBreaking;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The schedule has the wrong number of rounds.
    RoundCount,
    /// A round has the wrong number of activity groups.
    ActivityCount,
    /// An activity group does not hold `capacity` teams.
    GroupSize,
    /// A team id outside `[0, teams)`.
    UnknownTeam,
    /// A team appears more than once in one round.
    DuplicateTeam,
    /// A team is absent from a round.
    MissingTeam,
    /// A team visits an activity in more than one round.
    RepeatedVisit,
    /// A team never visits an activity.
    MissingVisit,
    /// Two teams share counted activities more often than allowed.
    MeetingLimitExceeded,
    /// A symmetry pin does not hold.
    PinViolated,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates a schedule against `params`.
///
/// Checks:
/// 1. `rounds` rounds of `activities` groups of `capacity` teams
/// 2. Every round is a partition of all teams
/// 3. Every team visits every activity exactly once
/// 4. No pair shares counted activities more than `limit` times
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_solution(solution: &Solution, params: &RotationParams) -> ValidationResult {
    let mut errors = Vec::new();
    let teams = params.teams();
    let activities = params.activities();

    if solution.round_count() != params.rounds() {
        errors.push(ValidationError::new(
            ValidationErrorKind::RoundCount,
            format!(
                "schedule has {} rounds, expected {}",
                solution.round_count(),
                params.rounds()
            ),
        ));
    }

    // visits[team * activities + activity]
    let mut visits = vec![0usize; teams * activities];

    for (round, groups) in solution.rounds().iter().enumerate() {
        if groups.len() != activities {
            errors.push(ValidationError::new(
                ValidationErrorKind::ActivityCount,
                format!(
                    "round {round} has {} activity groups, expected {activities}",
                    groups.len()
                ),
            ));
        }

        let mut seen = vec![false; teams];
        for (activity, group) in groups.iter().enumerate() {
            if group.len() != params.capacity() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::GroupSize,
                    format!(
                        "activity {activity} holds {} teams in round {round}, expected {}",
                        group.len(),
                        params.capacity()
                    ),
                ));
            }
            for &team in group {
                if team >= teams {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::UnknownTeam,
                        format!("unknown team {team} at activity {activity} in round {round}"),
                    ));
                    continue;
                }
                if seen[team] {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::DuplicateTeam,
                        format!("team {team} appears twice in round {round}"),
                    ));
                    continue;
                }
                seen[team] = true;
                if activity < activities {
                    visits[team * activities + activity] += 1;
                }
            }
        }

        for team in (0..teams).filter(|&t| !seen[t]) {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingTeam,
                format!("team {team} has no activity in round {round}"),
            ));
        }
    }

    for team in 0..teams {
        for activity in 0..activities {
            match visits[team * activities + activity] {
                1 => {}
                0 => errors.push(ValidationError::new(
                    ValidationErrorKind::MissingVisit,
                    format!("team {team} never visits activity {activity}"),
                )),
                n => errors.push(ValidationError::new(
                    ValidationErrorKind::RepeatedVisit,
                    format!("team {team} visits activity {activity} {n} times"),
                )),
            }
        }
    }

    let limit = params.meetings().limit;
    let exempt = params.no_conflict_activity();
    let mut met = vec![0usize; teams * teams];
    for groups in solution.rounds() {
        for (activity, group) in groups.iter().enumerate() {
            if Some(activity) == exempt {
                continue;
            }
            for (n, &a) in group.iter().enumerate() {
                for &b in &group[n + 1..] {
                    if a < teams && b < teams && a != b {
                        met[a.min(b) * teams + a.max(b)] += 1;
                    }
                }
            }
        }
    }
    for a in 0..teams {
        for b in a + 1..teams {
            let count = met[a * teams + b];
            if count > limit {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MeetingLimitExceeded,
                    format!("teams {a} and {b} meet {count} times, limit {limit}"),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates that the symmetry pins selected in `symmetry` hold.
pub fn validate_pins(
    solution: &Solution,
    params: &RotationParams,
    symmetry: &SymmetryBreaking,
) -> ValidationResult {
    let mut errors = Vec::new();

    if symmetry.pin_first_round {
        for team in 0..params.teams() {
            let expected = params.first_round_activity(team);
            let actual = solution.activity_of(team, 0);
            if actual != Some(expected) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::PinViolated,
                    format!("team {team} is at {actual:?} in round 0, expected activity {expected}"),
                ));
            }
        }
    }

    if symmetry.pin_first_team {
        for round in 0..params.rounds() {
            let actual = solution.activity_of(0, round);
            if actual != Some(round) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::PinViolated,
                    format!("team 0 is at {actual:?} in round {round}, expected activity {round}"),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::params::{Exemption, MeetingPolicy};

    fn params() -> RotationParams {
        RotationParams::new(4, 2, 2).unwrap()
    }

    /// 4 teams, 2 rounds; pairs {0,1} and {2,3} meet twice, once at the
    /// exempt activity 1.
    fn valid() -> Solution {
        Solution::new(vec![
            vec![vec![0, 1], vec![2, 3]],
            vec![vec![2, 3], vec![0, 1]],
        ])
    }

    fn kinds(result: ValidationResult) -> Vec<ValidationErrorKind> {
        result.unwrap_err().into_iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_valid() {
        assert!(validate_solution(&valid(), &params()).is_ok());
    }

    #[test]
    fn test_meeting_limit_without_exemption() {
        let strict = params()
            .with_meeting_policy(MeetingPolicy::default().with_exemption(Exemption::None))
            .unwrap();
        let errors = validate_solution(&valid(), &strict).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.kind == ValidationErrorKind::MeetingLimitExceeded));
        assert_eq!(errors[0].message, "teams 0 and 1 meet 2 times, limit 1");
    }

    #[test]
    fn test_repeated_visit() {
        let solution = Solution::new(vec![
            vec![vec![0, 1], vec![2, 3]],
            vec![vec![0, 1], vec![2, 3]],
        ]);
        let found = kinds(validate_solution(&solution, &params()));
        assert!(found.contains(&ValidationErrorKind::RepeatedVisit));
        assert!(found.contains(&ValidationErrorKind::MissingVisit));
    }

    #[test]
    fn test_partition_errors() {
        let solution = Solution::new(vec![
            vec![vec![0, 0], vec![2, 3]],
            vec![vec![2, 3], vec![0, 7]],
        ]);
        let found = kinds(validate_solution(&solution, &params()));
        assert!(found.contains(&ValidationErrorKind::DuplicateTeam));
        assert!(found.contains(&ValidationErrorKind::MissingTeam));
        assert!(found.contains(&ValidationErrorKind::UnknownTeam));
    }

    #[test]
    fn test_shape_errors() {
        let solution = Solution::new(vec![vec![vec![0, 1, 2], vec![3]]]);
        let found = kinds(validate_solution(&solution, &params()));
        assert!(found.contains(&ValidationErrorKind::RoundCount));
        assert!(found.contains(&ValidationErrorKind::GroupSize));

        let solution = Solution::new(vec![vec![vec![0, 1, 2, 3]], vec![vec![0, 1, 2, 3]]]);
        let found = kinds(validate_solution(&solution, &params()));
        assert!(found.contains(&ValidationErrorKind::ActivityCount));
    }

    #[test]
    fn test_pins() {
        let symmetry = SymmetryBreaking::default();
        assert!(validate_pins(&valid(), &params(), &symmetry).is_ok());

        let swapped = Solution::new(vec![
            vec![vec![2, 3], vec![0, 1]],
            vec![vec![0, 1], vec![2, 3]],
        ]);
        let errors = validate_pins(&swapped, &params(), &symmetry).unwrap_err();
        // 4 round-0 pins + 2 team-0 pins
        assert_eq!(errors.len(), 6);
        assert!(validate_pins(&swapped, &params(), &SymmetryBreaking::none()).is_ok());
    }
}
