//! Plain-text timetable rendering.
//!
//! One block per round: the round name, then one line per activity with
//! the names of the teams there. Entities without a configured name are
//! shown as `Round j`, `Activity k` and `Team i`.

use crate::cp::{ActivityId, RoundId, TeamId};
use crate::error::ConfigError;
use crate::rotation::{RotationParams, Solution};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Write;

/// Display names for teams, activities and rounds.
///
/// Each list is either empty (use fallbacks) or exactly as long as the
/// corresponding count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Names {
    pub teams: Vec<String>,
    pub activities: Vec<String>,
    pub rounds: Vec<String>,
}

impl Names {
    pub fn team(&self, team: TeamId) -> Cow<'_, str> {
        lookup(&self.teams, team, "Team")
    }

    pub fn activity(&self, activity: ActivityId) -> Cow<'_, str> {
        lookup(&self.activities, activity, "Activity")
    }

    pub fn round(&self, round: RoundId) -> Cow<'_, str> {
        lookup(&self.rounds, round, "Round")
    }

    /// Checks the list lengths against `params`.
    pub fn validate(&self, params: &RotationParams) -> Result<(), ConfigError> {
        for (what, names, expected) in [
            ("team", &self.teams, params.teams()),
            ("activity", &self.activities, params.activities()),
            ("round", &self.rounds, params.rounds()),
        ] {
            if !names.is_empty() && names.len() != expected {
                return Err(ConfigError::Invalid(format!(
                    "{} {what} names given for {expected} {what}s",
                    names.len()
                )));
            }
        }
        Ok(())
    }
}

fn lookup<'a>(names: &'a [String], i: usize, fallback: &str) -> Cow<'a, str> {
    match names.get(i) {
        Some(name) => Cow::Borrowed(name.as_str()),
        None => Cow::Owned(format!("{fallback} {i}")),
    }
}

/// Renders `solution` as a plain-text timetable.
///
/// # Examples
///
/// ```
/// use u_rotation::render::{render_table, Names};
/// use u_rotation::rotation::Solution;
///
/// let solution = Solution::new(vec![vec![vec![0, 1], vec![2, 3]]]);
/// let names = Names {
///     activities: vec!["Post 1".into(), "Pause".into()],
///     ..Names::default()
/// };
/// let table = render_table(&solution, &names);
/// assert!(table.starts_with("Round 0\n"));
/// assert!(table.contains("Pause   Team 2  Team 3"));
/// ```
pub fn render_table(solution: &Solution, names: &Names) -> String {
    let width = (0..solution.activity_count())
        .map(|k| names.activity(k).chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (round, groups) in solution.rounds().iter().enumerate() {
        if round > 0 {
            out.push('\n');
        }
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}", names.round(round));
        for (activity, teams) in groups.iter().enumerate() {
            let label = names.activity(activity);
            let _ = write!(out, "{label:<width$}");
            for &team in teams {
                let _ = write!(out, "  {}", names.team(team));
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution() -> Solution {
        Solution::new(vec![
            vec![vec![0, 1], vec![2, 3]],
            vec![vec![2, 3], vec![0, 1]],
        ])
    }

    #[test]
    fn test_fallback_names() {
        let table = render_table(&solution(), &Names::default());
        let expected = "\
Round 0
Activity 0  Team 0  Team 1
Activity 1  Team 2  Team 3

Round 1
Activity 0  Team 2  Team 3
Activity 1  Team 0  Team 1
";
        assert_eq!(table, expected);
    }

    #[test]
    fn test_configured_names() {
        let names = Names {
            teams: vec!["dat1".into(), "dat2".into(), "fys1".into(), "fys2".into()],
            activities: vec!["Post 1".into(), "Pause".into()],
            rounds: vec!["14:15-14:25".into(), "14:35-14:45".into()],
        };
        let table = render_table(&solution(), &names);
        assert!(table.starts_with("14:15-14:25\nPost 1  dat1  dat2\nPause   fys1  fys2\n"));
        assert!(table.contains("14:35-14:45\nPost 1  fys1  fys2\n"));
    }

    #[test]
    fn test_validate_lengths() {
        let params = RotationParams::new(4, 2, 2).unwrap();
        assert!(Names::default().validate(&params).is_ok());

        let names = Names {
            teams: vec!["a".into(), "b".into()],
            ..Names::default()
        };
        let err = names.validate(&params).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: 2 team names given for 4 teams"
        );
    }
}
