//! Model construction.

use super::params::RotationParams;
use super::symmetry::SymmetryBreaking;
use crate::cp::{Constraint, ConstraintKind, CpModel, VarIndex};
use tracing::info;

/// Builds the [`CpModel`] of a rotation schedule.
///
/// Constraints are emitted in a fixed order: one activity per team and
/// round, one visit per team and activity, group capacities, pairwise
/// meeting limits, then symmetry breaking.
///
/// # Examples
///
/// ```
/// use u_rotation::rotation::{ModelBuilder, RotationParams, SymmetryBreaking};
///
/// let params = RotationParams::new(8, 4, 2).unwrap();
/// let model = ModelBuilder::new(&params)
///     .with_symmetry(SymmetryBreaking::none())
///     .build();
///
/// assert_eq!(model.variable_count(), 8 * 4 * 4);
/// // 32 + 32 + 16 + 28
/// assert_eq!(model.constraint_count(), 108);
/// ```
#[derive(Debug, Clone)]
pub struct ModelBuilder<'a> {
    params: &'a RotationParams,
    symmetry: SymmetryBreaking,
}

impl<'a> ModelBuilder<'a> {
    /// Creates a builder with all symmetry breaking enabled.
    pub fn new(params: &'a RotationParams) -> Self {
        Self {
            params,
            symmetry: SymmetryBreaking::default(),
        }
    }

    pub fn with_symmetry(mut self, symmetry: SymmetryBreaking) -> Self {
        self.symmetry = symmetry;
        self
    }

    /// Emits the variables and constraints.
    pub fn build(&self) -> CpModel {
        let p = self.params;
        let teams = p.teams();
        let rounds = p.rounds();
        let index = VarIndex::new(teams, rounds);
        let mut model = CpModel::new(
            format!("rotation-{teams}x{rounds}x{}", p.capacity()),
            index,
        );

        for team in 0..teams {
            for round in 0..rounds {
                model.add_constraint(Constraint::OnePerRound { team, round });
            }
        }

        for team in 0..teams {
            for activity in 0..p.activities() {
                model.add_constraint(Constraint::VisitOnce { team, activity });
            }
        }

        for round in 0..rounds {
            for activity in 0..p.activities() {
                model.add_constraint(Constraint::Capacity {
                    round,
                    activity,
                    teams: p.capacity(),
                });
            }
        }

        let limit = p.meetings().limit;
        let exempt = p.no_conflict_activity();
        for first in 0..teams {
            for second in first + 1..teams {
                model.add_constraint(Constraint::MeetingLimit {
                    first,
                    second,
                    limit,
                    exempt,
                });
            }
        }

        for constraint in self.symmetry.constraints(p) {
            model.add_constraint(constraint);
        }

        info!(
            event = "model_built",
            model = %model.name,
            variables = model.variable_count(),
            constraints = model.constraint_count(),
            pins = model.count_of(ConstraintKind::Pin),
            lex_orders = model.count_of(ConstraintKind::LexOrder),
        );

        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::Assignment;
    use crate::rotation::params::{Exemption, MeetingPolicy};

    #[test]
    fn test_reference_counts() {
        let params = RotationParams::new(24, 6, 4).unwrap();
        let model = ModelBuilder::new(&params).build();

        assert_eq!(model.variable_count(), 864);
        assert_eq!(model.count_of(ConstraintKind::OnePerRound), 144);
        assert_eq!(model.count_of(ConstraintKind::VisitOnce), 144);
        assert_eq!(model.count_of(ConstraintKind::Capacity), 36);
        assert_eq!(model.count_of(ConstraintKind::MeetingLimit), 276);
        assert_eq!(model.count_of(ConstraintKind::Pin), 29);
        assert_eq!(model.count_of(ConstraintKind::LexOrder), 18);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_meeting_policy_flows_into_model() {
        let params = RotationParams::new(8, 4, 2)
            .unwrap()
            .with_meeting_policy(
                MeetingPolicy::default()
                    .with_limit(0)
                    .with_exemption(Exemption::None),
            )
            .unwrap();
        let model = ModelBuilder::new(&params).build();
        assert!(model
            .constraints_of(ConstraintKind::MeetingLimit)
            .all(|c| matches!(c, Constraint::MeetingLimit { limit: 0, exempt: None, .. })));
    }

    #[test]
    fn test_known_schedule_satisfies_model() {
        // 4 teams, 2 activities; pairs meet twice but once at the exempt activity 1.
        let params = RotationParams::new(4, 2, 2).unwrap();
        let model = ModelBuilder::new(&params).build();
        let rows = vec![vec![0, 1], vec![0, 1], vec![1, 0], vec![1, 0]];
        let assignment = Assignment::from_itineraries(&model.index, &rows);

        assert_eq!(model.first_violation(&assignment), None);
    }

    #[test]
    fn test_capacity_violation_detected() {
        let params = RotationParams::new(4, 2, 2).unwrap();
        let model = ModelBuilder::new(&params)
            .with_symmetry(SymmetryBreaking::none())
            .build();
        let rows = vec![vec![0, 1], vec![0, 1], vec![0, 1], vec![1, 0]];
        let assignment = Assignment::from_itineraries(&model.index, &rows);

        assert!(matches!(
            model.first_violation(&assignment),
            Some(Constraint::Capacity { round: 0, activity: 0, .. })
        ));
    }
}
