//! The schedule handed to presentation layers.

use crate::cp::{ActivityId, RoundId, TeamId};
use serde::{Deserialize, Serialize};

/// Teams per activity per round.
///
/// `rounds[j][k]` lists, in ascending order, the teams at activity `k`
/// during round `j`. Serialises as a bare nested JSON array.
///
/// # Examples
///
/// ```
/// use u_rotation::rotation::Solution;
///
/// let solution = Solution::new(vec![
///     vec![vec![0, 1], vec![2, 3]],
///     vec![vec![2, 3], vec![0, 1]],
/// ]);
/// assert_eq!(solution.activity_of(2, 1), Some(0));
/// assert_eq!(solution.to_json().unwrap(), "[[[0,1],[2,3]],[[2,3],[0,1]]]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Solution {
    rounds: Vec<Vec<Vec<TeamId>>>,
}

impl Solution {
    /// Wraps a round → activity → teams table.
    pub fn new(rounds: Vec<Vec<Vec<TeamId>>>) -> Self {
        Self { rounds }
    }

    /// The raw table.
    pub fn rounds(&self) -> &[Vec<Vec<TeamId>>] {
        &self.rounds
    }

    /// Number of rounds.
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Number of activity groups in round 0.
    pub fn activity_count(&self) -> usize {
        self.rounds.first().map_or(0, Vec::len)
    }

    /// Number of teams placed in round 0.
    pub fn team_count(&self) -> usize {
        self.rounds
            .first()
            .map_or(0, |groups| groups.iter().map(Vec::len).sum())
    }

    /// Teams at `activity` during `round`.
    pub fn teams_at(&self, round: RoundId, activity: ActivityId) -> &[TeamId] {
        self.rounds
            .get(round)
            .and_then(|groups| groups.get(activity))
            .map_or(&[], Vec::as_slice)
    }

    /// Activity of `team` during `round`.
    pub fn activity_of(&self, team: TeamId, round: RoundId) -> Option<ActivityId> {
        self.rounds
            .get(round)?
            .iter()
            .position(|group| group.contains(&team))
    }

    /// Activity per round for `team`.
    pub fn itinerary(&self, team: TeamId) -> Option<Vec<ActivityId>> {
        (0..self.round_count())
            .map(|round| self.activity_of(team, round))
            .collect()
    }

    /// Rounds in which `a` and `b` share an activity other than `exempt`.
    pub fn meetings(&self, a: TeamId, b: TeamId, exempt: Option<ActivityId>) -> usize {
        self.rounds
            .iter()
            .filter(|groups| {
                groups.iter().enumerate().any(|(k, group)| {
                    Some(k) != exempt && group.contains(&a) && group.contains(&b)
                })
            })
            .count()
    }

    /// Compact JSON, as written to `solution.json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses the JSON produced by [`to_json`](Self::to_json).
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
