//! Decision variables and their dense storage.
//!
//! The model has a single primitive: the 0/1 variable `x[i][j][k]`, true
//! iff team `i` is at activity `k` during round `j`. Variables are stored
//! flat, team-major:
//!
//! ```text
//! index(team, round, activity) = (team * rounds + round) * activities + activity
//! ```
//!
//! Rounds and activities share the same count, so a model with `T` teams
//! and `R` rounds has `T * R * R` variables.

use std::fmt;

/// Team identifier in `[0, teams)`.
pub type TeamId = usize;

/// Round (time slot) identifier in `[0, rounds)`.
pub type RoundId = usize;

/// Activity identifier in `[0, activities)`.
pub type ActivityId = usize;

/// A 0/1 decision variable, identified by its flat index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(pub usize);

impl Var {
    /// Flat index into an [`Assignment`].
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Maps `(team, round, activity)` triples to flat [`Var`]s and back.
///
/// # Examples
///
/// ```
/// use u_rotation::cp::VarIndex;
///
/// let index = VarIndex::new(24, 6);
/// assert_eq!(index.len(), 24 * 6 * 6);
///
/// let v = index.var(3, 2, 5);
/// assert_eq!(index.coords(v), (3, 2, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarIndex {
    teams: usize,
    rounds: usize,
}

impl VarIndex {
    /// Creates an index for `teams` teams and `rounds` rounds (= activities).
    pub fn new(teams: usize, rounds: usize) -> Self {
        Self { teams, rounds }
    }

    /// Number of teams.
    pub fn teams(&self) -> usize {
        self.teams
    }

    /// Number of rounds.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Number of activities (always equal to the number of rounds).
    pub fn activities(&self) -> usize {
        self.rounds
    }

    /// Total number of variables.
    pub fn len(&self) -> usize {
        self.teams * self.rounds * self.rounds
    }

    /// Whether the index holds no variables.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The variable `x[team][round][activity]`.
    ///
    /// # Panics
    /// Panics in debug builds when a coordinate is out of range.
    #[inline]
    pub fn var(&self, team: TeamId, round: RoundId, activity: ActivityId) -> Var {
        debug_assert!(team < self.teams, "team {team} out of range");
        debug_assert!(round < self.rounds, "round {round} out of range");
        debug_assert!(activity < self.rounds, "activity {activity} out of range");
        Var((team * self.rounds + round) * self.rounds + activity)
    }

    /// Inverse of [`var`](Self::var).
    pub fn coords(&self, var: Var) -> (TeamId, RoundId, ActivityId) {
        let activity = var.0 % self.rounds;
        let rest = var.0 / self.rounds;
        (rest / self.rounds, rest % self.rounds, activity)
    }

    /// The `activities` variables of one team in one round.
    pub fn cell(&self, team: TeamId, round: RoundId) -> impl Iterator<Item = Var> + '_ {
        (0..self.rounds).map(move |k| self.var(team, round, k))
    }
}

/// A total 0/1 assignment of every variable of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<u8>,
}

impl Assignment {
    /// An all-zero assignment of `len` variables.
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0; len],
        }
    }

    /// Wraps raw values. Values are expected to be 0 or 1; the extractor
    /// rejects anything else.
    pub fn from_values(values: Vec<u8>) -> Self {
        Self { values }
    }

    /// Builds the one-hot assignment of an itinerary table.
    ///
    /// `rows[team][round]` is the activity of `team` in `round`.
    pub fn from_itineraries(index: &VarIndex, rows: &[Vec<ActivityId>]) -> Self {
        let mut assignment = Self::zeros(index.len());
        for (team, row) in rows.iter().enumerate() {
            for (round, &activity) in row.iter().enumerate() {
                assignment.set(index.var(team, round, activity), 1);
            }
        }
        assignment
    }

    /// Value of a variable.
    #[inline]
    pub fn value(&self, var: Var) -> u8 {
        self.values[var.0]
    }

    /// Whether a variable is 1.
    #[inline]
    pub fn is_set(&self, var: Var) -> bool {
        self.values[var.0] == 1
    }

    /// Sets a variable.
    #[inline]
    pub fn set(&mut self, var: Var, value: u8) {
        self.values[var.0] = value;
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the assignment is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw values in flat order.
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// The single activity set for `(team, round)`, if exactly one is.
    pub fn activity_of(&self, index: &VarIndex, team: TeamId, round: RoundId) -> Option<ActivityId> {
        let mut found = None;
        for activity in 0..index.activities() {
            if self.is_set(index.var(team, round, activity)) {
                if found.is_some() {
                    return None;
                }
                found = Some(activity);
            }
        }
        found
    }

    /// Itinerary of a team (activity per round), if every round has
    /// exactly one activity set.
    pub fn itinerary(&self, index: &VarIndex, team: TeamId) -> Option<Vec<ActivityId>> {
        (0..index.rounds())
            .map(|round| self.activity_of(index, team, round))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flattening_order() {
        let index = VarIndex::new(4, 2);
        assert_eq!(index.var(0, 0, 0), Var(0));
        assert_eq!(index.var(0, 0, 1), Var(1));
        assert_eq!(index.var(0, 1, 0), Var(2));
        assert_eq!(index.var(1, 0, 0), Var(4));
        assert_eq!(index.var(3, 1, 1), Var(15));
        assert_eq!(index.len(), 16);
    }

    #[test]
    fn test_coords_inverse() {
        let index = VarIndex::new(24, 6);
        for raw in 0..index.len() {
            let (t, r, a) = index.coords(Var(raw));
            assert_eq!(index.var(t, r, a), Var(raw));
        }
    }

    #[test]
    fn test_cell_vars() {
        let index = VarIndex::new(6, 3);
        let cell: Vec<Var> = index.cell(2, 1).collect();
        assert_eq!(cell, vec![Var(21), Var(22), Var(23)]);
    }

    #[test]
    fn test_assignment_from_itineraries() {
        let index = VarIndex::new(2, 2);
        let rows = vec![vec![0, 1], vec![1, 0]];
        let assignment = Assignment::from_itineraries(&index, &rows);

        assert_eq!(assignment.len(), 8);
        assert!(assignment.is_set(index.var(0, 0, 0)));
        assert!(!assignment.is_set(index.var(0, 0, 1)));
        assert_eq!(assignment.activity_of(&index, 1, 0), Some(1));
        assert_eq!(assignment.itinerary(&index, 1), Some(vec![1, 0]));
    }

    #[test]
    fn test_activity_of_ambiguous() {
        let index = VarIndex::new(1, 2);
        let mut assignment = Assignment::zeros(index.len());
        assert_eq!(assignment.activity_of(&index, 0, 0), None);

        assignment.set(index.var(0, 0, 0), 1);
        assignment.set(index.var(0, 0, 1), 1);
        assert_eq!(assignment.activity_of(&index, 0, 0), None);
    }
}
