//! Symmetry breaking.
//!
//! Any schedule can be relabelled into one that satisfies the constraints
//! emitted here, so adding them never turns a feasible instance into an
//! infeasible one:
//!
//! - **First round**: teams are renumbered so that round 0 groups them by
//!   index, team `i` at activity `i / C`.
//! - **First team**: rounds are reordered so that team 0 visits activity
//!   `j` in round `j`.
//! - **Group order**: teams of one round-0 group are interchangeable, so
//!   their itineraries can be sorted. Team 0's identity itinerary is the
//!   smallest possible one in group 0, which keeps this compatible with the
//!   first-team pins.

use super::params::RotationParams;
use crate::cp::Constraint;
use serde::{Deserialize, Serialize};

/// Which symmetry-breaking constraints to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymmetryBreaking {
    /// Pin team `i` to activity `i / C` in round 0.
    pub pin_first_round: bool,
    /// Pin team 0 to activity `j` in round `j`.
    pub pin_first_team: bool,
    /// Order itineraries within each round-0 group. Needs `pin_first_round`.
    pub order_within_groups: bool,
}

impl Default for SymmetryBreaking {
    fn default() -> Self {
        Self {
            pin_first_round: true,
            pin_first_team: true,
            order_within_groups: true,
        }
    }
}

impl SymmetryBreaking {
    /// No symmetry breaking at all.
    pub fn none() -> Self {
        Self {
            pin_first_round: false,
            pin_first_team: false,
            order_within_groups: false,
        }
    }

    /// Only the two pinning reductions.
    pub fn pins_only() -> Self {
        Self {
            order_within_groups: false,
            ..Self::default()
        }
    }

    /// The symmetry-breaking constraints for `params`.
    pub fn constraints(&self, params: &RotationParams) -> Vec<Constraint> {
        let mut out = Vec::new();
        let capacity = params.capacity();

        if self.pin_first_round {
            for team in 0..params.teams() {
                out.push(Constraint::Pin {
                    team,
                    round: 0,
                    activity: params.first_round_activity(team),
                });
            }
        }

        if self.pin_first_team {
            // Round 0 of team 0 is already pinned above.
            let from = usize::from(self.pin_first_round);
            for round in from..params.rounds() {
                out.push(Constraint::Pin {
                    team: 0,
                    round,
                    activity: round,
                });
            }
        }

        if self.pin_first_round && self.order_within_groups {
            for group in 0..params.activities() {
                let first = group * capacity;
                for team in first..first + capacity - 1 {
                    out.push(Constraint::LexOrder {
                        first: team,
                        second: team + 1,
                    });
                }
            }
        }

        out
    }
}
