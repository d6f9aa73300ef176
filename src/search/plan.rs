//! Dense constraint tables compiled from a [`CpModel`].
//!
//! Both backends search over cells `(team, round) → activity`, so a model
//! is only accepted if it states [`Constraint::OnePerRound`] for every
//! cell. Everything else is folded into lookup tables indexed the same
//! way as the search state.

use crate::cp::{ActivityId, Constraint, CpModel, TeamId};

/// Meeting limit between one pair of teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PairRule {
    pub limit: usize,
    pub exempt: Option<ActivityId>,
}

impl PairRule {
    /// Whether sharing `activity` counts towards the limit.
    pub fn counts(&self, activity: ActivityId) -> bool {
        self.exempt != Some(activity)
    }
}

/// Why a model could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlanError {
    /// The model is outside what the backends search over.
    Unsupported(String),
    /// The constraints contradict each other outright.
    Contradiction(String),
}

/// Lookup tables for the search.
#[derive(Debug, Clone)]
pub(crate) struct SearchPlan {
    pub teams: usize,
    pub rounds: usize,
    /// `[team * rounds + round]`
    pub pins: Vec<Option<ActivityId>>,
    /// `[round * rounds + activity]`
    pub capacity: Vec<Option<usize>>,
    /// `[team * rounds + activity]`
    pub visit_once: Vec<bool>,
    /// `[min(a, b) * teams + max(a, b)]`
    pub pairs: Vec<Option<PairRule>>,
    /// Earlier teams whose itinerary must be `<=` this team's.
    pub lower: Vec<Vec<TeamId>>,
    /// Earlier teams whose itinerary must be `>=` this team's.
    pub upper: Vec<Vec<TeamId>>,
    /// Every `LexOrder` as `(first, second)`, in model order.
    pub lex_pairs: Vec<(TeamId, TeamId)>,
}

impl SearchPlan {
    pub fn compile(model: &CpModel) -> Result<Self, PlanError> {
        model.validate().map_err(PlanError::Unsupported)?;

        let teams = model.index.teams();
        let rounds = model.index.rounds();
        let mut plan = Self {
            teams,
            rounds,
            pins: vec![None; teams * rounds],
            capacity: vec![None; rounds * rounds],
            visit_once: vec![false; teams * rounds],
            pairs: vec![None; teams * teams],
            lower: vec![Vec::new(); teams],
            upper: vec![Vec::new(); teams],
            lex_pairs: Vec::new(),
        };
        let mut one_per_round = vec![false; teams * rounds];

        for constraint in &model.constraints {
            match *constraint {
                Constraint::OnePerRound { team, round } => {
                    one_per_round[team * rounds + round] = true;
                }
                Constraint::VisitOnce { team, activity } => {
                    plan.visit_once[team * rounds + activity] = true;
                }
                Constraint::Capacity {
                    round,
                    activity,
                    teams: n,
                } => {
                    let slot = &mut plan.capacity[round * rounds + activity];
                    match *slot {
                        Some(existing) if existing != n => {
                            return Err(PlanError::Contradiction(format!(
                                "activity {activity} in round {round} must hold both {existing} and {n} teams"
                            )))
                        }
                        _ => *slot = Some(n),
                    }
                }
                Constraint::MeetingLimit {
                    first,
                    second,
                    limit,
                    exempt,
                } => {
                    let slot = &mut plan.pairs[pair_index(teams, first, second)];
                    match *slot {
                        Some(rule) if rule.exempt != exempt => {
                            return Err(PlanError::Unsupported(format!(
                                "teams {first} and {second} have meeting limits with different exemptions"
                            )))
                        }
                        Some(rule) => slot.replace(PairRule {
                            limit: rule.limit.min(limit),
                            exempt,
                        }),
                        None => slot.replace(PairRule { limit, exempt }),
                    };
                }
                Constraint::Pin {
                    team,
                    round,
                    activity,
                } => {
                    let slot = &mut plan.pins[team * rounds + round];
                    match *slot {
                        Some(existing) if existing != activity => {
                            return Err(PlanError::Contradiction(format!(
                                "team {team} is pinned to activities {existing} and {activity} in round {round}"
                            )))
                        }
                        _ => *slot = Some(activity),
                    }
                }
                Constraint::LexOrder { first, second } => {
                    plan.lex_pairs.push((first, second));
                    if first < second {
                        plan.lower[second].push(first);
                    } else if first > second {
                        plan.upper[first].push(second);
                    }
                }
            }
        }

        if let Some(cell) = one_per_round.iter().position(|&set| !set) {
            return Err(PlanError::Unsupported(format!(
                "team {} has no one-activity-per-round constraint for round {}",
                cell / rounds,
                cell % rounds
            )));
        }

        Ok(plan)
    }

    pub fn pin(&self, team: TeamId, round: usize) -> Option<ActivityId> {
        self.pins[team * self.rounds + round]
    }

    pub fn pair(&self, a: TeamId, b: TeamId) -> Option<&PairRule> {
        self.pairs[pair_index(self.teams, a, b)].as_ref()
    }

    /// Whether swapping the whole itineraries of `a` and `b` preserves
    /// every constraint other than `LexOrder`.
    pub fn interchangeable(&self, a: TeamId, b: TeamId) -> bool {
        let r = self.rounds;
        self.pins[a * r..(a + 1) * r] == self.pins[b * r..(b + 1) * r]
            && self.visit_once[a * r..(a + 1) * r] == self.visit_once[b * r..(b + 1) * r]
            && (0..self.teams)
                .filter(|&o| o != a && o != b)
                .all(|o| self.pair(a, o) == self.pair(b, o))
    }
}

/// Index of the unordered pair `{a, b}` in a `teams × teams` table.
pub(crate) fn pair_index(teams: usize, a: TeamId, b: TeamId) -> usize {
    a.min(b) * teams + a.max(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::VarIndex;
    use crate::rotation::{ModelBuilder, RotationParams, SymmetryBreaking};

    fn plan(teams: usize, activities: usize, capacity: usize) -> SearchPlan {
        let params = RotationParams::new(teams, activities, capacity).unwrap();
        SearchPlan::compile(&ModelBuilder::new(&params).build()).unwrap()
    }

    #[test]
    fn test_tables_from_builder() {
        let plan = plan(8, 4, 2);
        assert_eq!(plan.pin(5, 0), Some(2));
        assert_eq!(plan.pin(0, 3), Some(3));
        assert_eq!(plan.pin(5, 1), None);
        assert!(plan.capacity.iter().all(|&c| c == Some(2)));
        assert!(plan.visit_once.iter().all(|&v| v));
        assert_eq!(
            plan.pair(6, 2),
            Some(&PairRule {
                limit: 1,
                exempt: Some(3)
            })
        );
        assert_eq!(plan.lower[1], vec![0]);
        assert_eq!(plan.lower[7], vec![6]);
        assert!(plan.lower[2].is_empty());
        assert_eq!(plan.lex_pairs.len(), 4);
    }

    #[test]
    fn test_interchangeable() {
        let plan = plan(12, 4, 3);
        assert!(plan.interchangeable(4, 5));
        assert!(plan.interchangeable(1, 2));
        // Team 0 carries extra pins; teams of different groups differ in round 0.
        assert!(!plan.interchangeable(0, 1));
        assert!(!plan.interchangeable(3, 6));
    }

    #[test]
    fn test_missing_one_per_round() {
        let mut model = CpModel::new("partial", VarIndex::new(2, 2));
        model.add_constraint(Constraint::OnePerRound { team: 0, round: 0 });
        assert!(matches!(
            SearchPlan::compile(&model),
            Err(PlanError::Unsupported(_))
        ));
    }

    #[test]
    fn test_conflicting_pins() {
        let params = RotationParams::new(4, 2, 2).unwrap();
        let mut model = ModelBuilder::new(&params)
            .with_symmetry(SymmetryBreaking::none())
            .build();
        model.add_constraint(Constraint::Pin {
            team: 1,
            round: 1,
            activity: 0,
        });
        model.add_constraint(Constraint::Pin {
            team: 1,
            round: 1,
            activity: 1,
        });
        assert!(matches!(
            SearchPlan::compile(&model),
            Err(PlanError::Contradiction(_))
        ));
    }

    #[test]
    fn test_duplicate_meeting_limits_take_minimum() {
        let params = RotationParams::new(4, 2, 2).unwrap();
        let mut model = ModelBuilder::new(&params).build();
        model.add_constraint(Constraint::MeetingLimit {
            first: 3,
            second: 2,
            limit: 0,
            exempt: Some(1),
        });
        let plan = SearchPlan::compile(&model).unwrap();
        assert_eq!(plan.pair(2, 3).map(|r| r.limit), Some(0));
        assert_eq!(plan.pair(0, 1).map(|r| r.limit), Some(1));
    }
}
