//! CP model definition.
//!
//! A [`CpModel`] is a variable index plus a list of [`Constraint`]s. Every
//! constraint except [`Constraint::LexOrder`] lowers to a pseudo-boolean
//! form `Σ terms (= | ≤) bound` over the 0/1 variables, so an external
//! SAT/ILP backend can consume the model without knowing its meaning.

use super::variables::{ActivityId, Assignment, RoundId, TeamId, Var, VarIndex};
use std::fmt;

/// A constraint of the rotation model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Exactly one activity for `team` during `round`.
    OnePerRound { team: TeamId, round: RoundId },

    /// `team` visits `activity` in exactly one round.
    VisitOnce { team: TeamId, activity: ActivityId },

    /// Exactly `teams` teams at `activity` during `round`.
    Capacity {
        round: RoundId,
        activity: ActivityId,
        teams: usize,
    },

    /// `first` and `second` share an activity in at most `limit` rounds.
    ///
    /// Rounds spent together at the `exempt` activity are not counted.
    MeetingLimit {
        first: TeamId,
        second: TeamId,
        limit: usize,
        exempt: Option<ActivityId>,
    },

    /// `team` is at `activity` during `round`.
    Pin {
        team: TeamId,
        round: RoundId,
        activity: ActivityId,
    },

    /// The itinerary of `first` is lexicographically `<=` that of `second`,
    /// comparing activity indices round by round.
    LexOrder { first: TeamId, second: TeamId },
}

/// Coarse classification of constraints, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintKind {
    OnePerRound,
    VisitOnce,
    Capacity,
    MeetingLimit,
    Pin,
    LexOrder,
}

/// A term of a pseudo-boolean expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    /// A single variable.
    Var(Var),
    /// The product of two variables (1 iff both are 1).
    Product(Var, Var),
}

/// Comparison of a pseudo-boolean sum against its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    AtMost,
}

/// `Σ terms (= | ≤) bound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbConstraint {
    pub terms: Vec<Term>,
    pub relation: Relation,
    pub bound: usize,
}

impl PbConstraint {
    /// Sum of the terms under `assignment`.
    pub fn evaluate(&self, assignment: &Assignment) -> usize {
        self.terms
            .iter()
            .map(|term| match *term {
                Term::Var(v) => assignment.value(v) as usize,
                Term::Product(a, b) => assignment.value(a) as usize * assignment.value(b) as usize,
            })
            .sum()
    }

    /// Whether `assignment` satisfies the constraint.
    pub fn holds(&self, assignment: &Assignment) -> bool {
        let sum = self.evaluate(assignment);
        match self.relation {
            Relation::Equal => sum == self.bound,
            Relation::AtMost => sum <= self.bound,
        }
    }
}

impl Constraint {
    /// The constraint's kind.
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::OnePerRound { .. } => ConstraintKind::OnePerRound,
            Constraint::VisitOnce { .. } => ConstraintKind::VisitOnce,
            Constraint::Capacity { .. } => ConstraintKind::Capacity,
            Constraint::MeetingLimit { .. } => ConstraintKind::MeetingLimit,
            Constraint::Pin { .. } => ConstraintKind::Pin,
            Constraint::LexOrder { .. } => ConstraintKind::LexOrder,
        }
    }

    /// Lowers the constraint to pseudo-boolean form.
    ///
    /// Returns `None` for [`Constraint::LexOrder`], which has no compact
    /// linear encoding and is checked structurally instead.
    pub fn pseudo_boolean(&self, index: &VarIndex) -> Option<PbConstraint> {
        let n = index.rounds();
        let pb = match *self {
            Constraint::OnePerRound { team, round } => PbConstraint {
                terms: index.cell(team, round).map(Term::Var).collect(),
                relation: Relation::Equal,
                bound: 1,
            },
            Constraint::VisitOnce { team, activity } => PbConstraint {
                terms: (0..n)
                    .map(|round| Term::Var(index.var(team, round, activity)))
                    .collect(),
                relation: Relation::Equal,
                bound: 1,
            },
            Constraint::Capacity {
                round,
                activity,
                teams,
            } => PbConstraint {
                terms: (0..index.teams())
                    .map(|team| Term::Var(index.var(team, round, activity)))
                    .collect(),
                relation: Relation::Equal,
                bound: teams,
            },
            Constraint::MeetingLimit {
                first,
                second,
                limit,
                exempt,
            } => {
                let mut terms = Vec::with_capacity(n * n);
                for round in 0..n {
                    for activity in (0..n).filter(|&k| Some(k) != exempt) {
                        terms.push(Term::Product(
                            index.var(first, round, activity),
                            index.var(second, round, activity),
                        ));
                    }
                }
                PbConstraint {
                    terms,
                    relation: Relation::AtMost,
                    bound: limit,
                }
            }
            Constraint::Pin {
                team,
                round,
                activity,
            } => PbConstraint {
                terms: vec![Term::Var(index.var(team, round, activity))],
                relation: Relation::Equal,
                bound: 1,
            },
            Constraint::LexOrder { .. } => return None,
        };
        Some(pb)
    }

    /// Whether `assignment` satisfies the constraint.
    pub fn is_satisfied(&self, index: &VarIndex, assignment: &Assignment) -> bool {
        match *self {
            Constraint::LexOrder { first, second } => {
                match (
                    assignment.itinerary(index, first),
                    assignment.itinerary(index, second),
                ) {
                    (Some(a), Some(b)) => a <= b,
                    _ => false,
                }
            }
            _ => self
                .pseudo_boolean(index)
                .is_some_and(|pb| pb.holds(assignment)),
        }
    }

    /// Teams referenced by the constraint.
    fn teams(&self) -> Vec<TeamId> {
        match *self {
            Constraint::OnePerRound { team, .. }
            | Constraint::VisitOnce { team, .. }
            | Constraint::Pin { team, .. } => vec![team],
            Constraint::MeetingLimit { first, second, .. }
            | Constraint::LexOrder { first, second } => vec![first, second],
            Constraint::Capacity { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Constraint::OnePerRound { team, round } => {
                write!(f, "team {team} has exactly one activity in round {round}")
            }
            Constraint::VisitOnce { team, activity } => {
                write!(f, "team {team} visits activity {activity} exactly once")
            }
            Constraint::Capacity {
                round,
                activity,
                teams,
            } => write!(f, "activity {activity} holds {teams} teams in round {round}"),
            Constraint::MeetingLimit {
                first,
                second,
                limit,
                exempt,
            } => {
                write!(f, "teams {first} and {second} meet at most {limit} time(s)")?;
                if let Some(k) = exempt {
                    write!(f, " outside activity {k}")?;
                }
                Ok(())
            }
            Constraint::Pin {
                team,
                round,
                activity,
            } => write!(f, "team {team} is at activity {activity} in round {round}"),
            Constraint::LexOrder { first, second } => {
                write!(f, "itinerary of team {first} <= itinerary of team {second}")
            }
        }
    }
}

/// A constraint programming model over 0/1 assignment variables.
///
/// # Examples
///
/// ```
/// use u_rotation::cp::{Constraint, CpModel, VarIndex};
///
/// let mut model = CpModel::new("tiny", VarIndex::new(2, 1));
/// model.add_constraint(Constraint::Capacity { round: 0, activity: 0, teams: 2 });
/// assert_eq!(model.variable_count(), 2);
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Variable index.
    pub index: VarIndex,
    /// Constraints, in emission order.
    pub constraints: Vec<Constraint>,
}

impl CpModel {
    /// Creates an empty model over `index`.
    pub fn new(name: impl Into<String>, index: VarIndex) -> Self {
        Self {
            name: name.into(),
            index,
            constraints: Vec::new(),
        }
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Number of 0/1 variables.
    pub fn variable_count(&self) -> usize {
        self.index.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Number of constraints of one kind.
    pub fn count_of(&self, kind: ConstraintKind) -> usize {
        self.constraints.iter().filter(|c| c.kind() == kind).count()
    }

    /// Iterates the constraints of one kind.
    pub fn constraints_of(&self, kind: ConstraintKind) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.kind() == kind)
    }

    /// Validates that every referenced team, round and activity exists.
    pub fn validate(&self) -> Result<(), String> {
        let teams = self.index.teams();
        let n = self.index.rounds();
        for constraint in &self.constraints {
            if let Some(team) = constraint.teams().into_iter().find(|&t| t >= teams) {
                return Err(format!("undefined team {team} in `{constraint}`"));
            }
            let (round, activity) = match *constraint {
                Constraint::OnePerRound { round, .. } => (Some(round), None),
                Constraint::VisitOnce { activity, .. } => (None, Some(activity)),
                Constraint::Capacity {
                    round, activity, ..
                }
                | Constraint::Pin {
                    round, activity, ..
                } => (Some(round), Some(activity)),
                Constraint::MeetingLimit {
                    first,
                    second,
                    exempt,
                    ..
                } => {
                    if first == second {
                        return Err(format!("meeting limit on a single team: `{constraint}`"));
                    }
                    (None, exempt)
                }
                Constraint::LexOrder { .. } => (None, None),
            };
            if round.is_some_and(|r| r >= n) {
                return Err(format!("undefined round in `{constraint}`"));
            }
            if activity.is_some_and(|k| k >= n) {
                return Err(format!("undefined activity in `{constraint}`"));
            }
        }
        Ok(())
    }

    /// The first constraint `assignment` violates, if any.
    pub fn first_violation(&self, assignment: &Assignment) -> Option<&Constraint> {
        if assignment.len() != self.index.len() {
            return self.constraints.first();
        }
        self.constraints
            .iter()
            .find(|c| !c.is_satisfied(&self.index, assignment))
    }

    /// Whether `assignment` satisfies every constraint.
    pub fn is_satisfied_by(&self, assignment: &Assignment) -> bool {
        assignment.len() == self.index.len() && self.first_violation(assignment).is_none()
    }
}
