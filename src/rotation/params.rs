//! Problem parameters and the meeting policy.

use crate::cp::ActivityId;
use crate::error::ConfigError;

/// Which activity, if any, is exempt from the meeting limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Exemption {
    /// The last activity (index `activities - 1`).
    #[default]
    Last,
    /// A specific activity.
    Activity(ActivityId),
    /// Every activity counts.
    None,
}

/// How often two teams may share an activity.
///
/// # Examples
///
/// ```
/// use u_rotation::rotation::{Exemption, MeetingPolicy};
///
/// let strict = MeetingPolicy::default()
///     .with_limit(0)
///     .with_exemption(Exemption::None);
/// assert_eq!(strict.limit, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeetingPolicy {
    /// Maximum number of rounds two teams may share a counted activity.
    pub limit: usize,
    /// The no-conflict activity.
    pub exemption: Exemption,
}

impl Default for MeetingPolicy {
    fn default() -> Self {
        Self {
            limit: 1,
            exemption: Exemption::Last,
        }
    }
}

impl MeetingPolicy {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_exemption(mut self, exemption: Exemption) -> Self {
        self.exemption = exemption;
        self
    }
}

/// Validated team / activity / capacity counts.
///
/// The schedule is square: there are as many rounds as activities, and
/// `teams = activities × capacity`.
///
/// # Examples
///
/// ```
/// use u_rotation::rotation::RotationParams;
///
/// let params = RotationParams::new(24, 6, 4).unwrap();
/// assert_eq!(params.rounds(), 6);
/// assert_eq!(params.no_conflict_activity(), Some(5));
///
/// assert!(RotationParams::new(24, 6, 5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationParams {
    teams: usize,
    activities: usize,
    capacity: usize,
    meetings: MeetingPolicy,
}

impl RotationParams {
    /// Validates and creates parameters with the default meeting policy.
    pub fn new(teams: usize, activities: usize, capacity: usize) -> Result<Self, ConfigError> {
        if teams == 0 || activities == 0 || capacity == 0 {
            return Err(ConfigError::Invalid(format!(
                "teams, activities and capacity must be positive (got {teams}, {activities}, {capacity})"
            )));
        }
        if teams % activities != 0 {
            return Err(ConfigError::Invalid(format!(
                "{teams} teams cannot be split evenly over {activities} activities"
            )));
        }
        if teams / activities != capacity {
            let expected = match activities.checked_mul(capacity) {
                Some(n) => format!("{n} teams"),
                None => format!("more than {} teams", usize::MAX),
            };
            return Err(ConfigError::Invalid(format!(
                "{teams} teams do not fill {activities} activities of {capacity} teams each \
                 (expected {expected})"
            )));
        }
        Ok(Self {
            teams,
            activities,
            capacity,
            meetings: MeetingPolicy::default(),
        })
    }

    /// Derives the activity count from `teams / capacity`.
    pub fn from_teams(teams: usize, capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 || teams % capacity != 0 {
            return Err(ConfigError::Invalid(format!(
                "{teams} teams cannot be grouped by {capacity}"
            )));
        }
        Self::new(teams, teams / capacity, capacity)
    }

    /// Replaces the meeting policy, checking the exempt activity exists.
    pub fn with_meeting_policy(mut self, policy: MeetingPolicy) -> Result<Self, ConfigError> {
        if let Exemption::Activity(k) = policy.exemption {
            if k >= self.activities {
                return Err(ConfigError::Invalid(format!(
                    "no-conflict activity {k} out of range (activities: {})",
                    self.activities
                )));
            }
        }
        self.meetings = policy;
        Ok(self)
    }

    /// Number of teams (`T`).
    pub fn teams(&self) -> usize {
        self.teams
    }

    /// Number of activities, no-conflict activity included.
    pub fn activities(&self) -> usize {
        self.activities
    }

    /// Number of rounds (`R`, equal to the activity count).
    pub fn rounds(&self) -> usize {
        self.activities
    }

    /// Teams per activity and round (`C`).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The meeting policy.
    pub fn meetings(&self) -> &MeetingPolicy {
        &self.meetings
    }

    /// The activity exempt from the meeting limit, if any.
    pub fn no_conflict_activity(&self) -> Option<ActivityId> {
        match self.meetings.exemption {
            Exemption::Last => Some(self.activities - 1),
            Exemption::Activity(k) => Some(k),
            Exemption::None => None,
        }
    }

    /// Round-0 group of a team under the canonical first round.
    pub fn first_round_activity(&self, team: usize) -> ActivityId {
        team / self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_instance() {
        let params = RotationParams::new(24, 6, 4).unwrap();
        assert_eq!(params.teams(), 24);
        assert_eq!(params.rounds(), 6);
        assert_eq!(params.capacity(), 4);
        assert_eq!(params.meetings().limit, 1);
        assert_eq!(params.no_conflict_activity(), Some(5));
    }

    #[test]
    fn test_capacity_mismatch_rejected() {
        let err = RotationParams::new(24, 6, 5).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("expected 30 teams"));
    }

    #[test]
    fn test_huge_capacity_rejected() {
        let err = RotationParams::new(4, 4, usize::MAX).unwrap_err();
        assert!(err.to_string().contains(&format!("more than {} teams", usize::MAX)));
    }

    #[test]
    fn test_uneven_split_rejected() {
        assert!(RotationParams::new(25, 6, 4).is_err());
        assert!(RotationParams::new(0, 6, 4).is_err());
        assert!(RotationParams::new(6, 0, 4).is_err());
    }

    #[test]
    fn test_from_teams() {
        let params = RotationParams::from_teams(24, 4).unwrap();
        assert_eq!(params.activities(), 6);
        assert!(RotationParams::from_teams(24, 5).is_err());
        assert!(RotationParams::from_teams(24, 0).is_err());
    }

    #[test]
    fn test_meeting_policy() {
        let params = RotationParams::new(8, 4, 2).unwrap();

        let none = params
            .with_meeting_policy(MeetingPolicy::default().with_exemption(Exemption::None))
            .unwrap();
        assert_eq!(none.no_conflict_activity(), None);

        let first = params
            .with_meeting_policy(MeetingPolicy::default().with_exemption(Exemption::Activity(0)))
            .unwrap();
        assert_eq!(first.no_conflict_activity(), Some(0));

        assert!(params
            .with_meeting_policy(MeetingPolicy::default().with_exemption(Exemption::Activity(4)))
            .is_err());
    }

    #[test]
    fn test_first_round_activity() {
        let params = RotationParams::new(24, 6, 4).unwrap();
        assert_eq!(params.first_round_activity(0), 0);
        assert_eq!(params.first_round_activity(3), 0);
        assert_eq!(params.first_round_activity(4), 1);
        assert_eq!(params.first_round_activity(23), 5);
    }
}
