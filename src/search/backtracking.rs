//! Exact depth-first search.
//!
//! Each `(team, round)` cell is one finite-domain variable over the
//! activities, so exactly one activity per cell holds by construction and
//! the 0/1 assignment is only materialised for the answer. Cells are filled
//! team-major: the search completes one team's itinerary before starting
//! the next, which keeps the meeting counters small and lets itinerary
//! ordering prune whole subtrees.
//!
//! Pruning on every placement:
//! - pinned cells admit only their pinned activity
//! - an activity already visited by the team is skipped
//! - a full activity group is skipped
//! - only the current occupants of the target group can exceed their
//!   meeting limit with the placed team
//! - lexicographic bounds against already completed itineraries

use super::plan::{pair_index, PlanError, SearchPlan};
use crate::cp::{
    ActivityId, Assignment, Budget, CpModel, CpSolver, SolveLimits, SolveOutcome, SolveReport,
    SolveStats, TeamId,
};
use crate::error::SolverFault;
use tracing::debug;

/// Limits are polled once per this many nodes.
const CHECK_INTERVAL: u64 = 1 << 10;
/// Progress is logged once per this many nodes.
const PROGRESS_INTERVAL: u64 = 1 << 20;

/// Complete, deterministic backtracking search.
///
/// Exhausting the search tree proves the model unsatisfiable.
///
/// # Examples
///
/// ```
/// use u_rotation::cp::{CpSolver, SolveLimits};
/// use u_rotation::rotation::{ModelBuilder, RotationParams};
/// use u_rotation::search::BacktrackingSolver;
///
/// let params = RotationParams::new(12, 4, 3).unwrap();
/// let model = ModelBuilder::new(&params).build();
/// let report = BacktrackingSolver::new().solve(&model, &SolveLimits::default());
/// assert!(report.outcome.is_satisfiable());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktrackingSolver;

impl BacktrackingSolver {
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for BacktrackingSolver {
    fn name(&self) -> &'static str {
        "backtracking"
    }

    fn solve(&self, model: &CpModel, limits: &SolveLimits) -> SolveReport {
        let budget = limits.start();

        let plan = match SearchPlan::compile(model) {
            Ok(plan) => plan,
            Err(PlanError::Contradiction(reason)) => {
                debug!(event = "contradiction", reason = %reason);
                return report(SolveOutcome::Unsatisfiable, 0, &budget);
            }
            Err(PlanError::Unsupported(reason)) => {
                return report(
                    SolveOutcome::Fault(SolverFault::Internal(reason)),
                    0,
                    &budget,
                );
            }
        };

        if let Some(fault) = budget.exhausted(0) {
            return report(SolveOutcome::Fault(fault), 0, &budget);
        }

        let mut search = Search::new(&plan, &budget);
        let result = search.fill(0, 0);
        let nodes = search.nodes;

        let outcome = match result {
            Ok(true) => {
                let rows: Vec<Vec<ActivityId>> = search
                    .cells
                    .chunks(plan.rounds.max(1))
                    .take(plan.teams)
                    .map(<[ActivityId]>::to_vec)
                    .collect();
                let assignment = Assignment::from_itineraries(&model.index, &rows);
                match model.first_violation(&assignment) {
                    None => SolveOutcome::Satisfiable(assignment),
                    Some(violated) => SolveOutcome::Fault(SolverFault::Internal(format!(
                        "search produced an assignment violating `{violated}`"
                    ))),
                }
            }
            Ok(false) => SolveOutcome::Unsatisfiable,
            Err(fault) => SolveOutcome::Fault(fault),
        };

        report(outcome, nodes, &budget)
    }
}

fn report(outcome: SolveOutcome, nodes: u64, budget: &Budget<'_>) -> SolveReport {
    SolveReport {
        outcome,
        stats: SolveStats {
            nodes,
            elapsed: budget.elapsed(),
            restarts: 0,
        },
    }
}

/// Mutable search state.
struct Search<'a> {
    plan: &'a SearchPlan,
    budget: &'a Budget<'a>,
    /// `[team * rounds + round]`, valid for placed cells only.
    cells: Vec<ActivityId>,
    /// `[round * rounds + activity]`, teams in placement order.
    groups: Vec<Vec<TeamId>>,
    /// `[team * rounds + activity]`
    visits: Vec<u32>,
    /// `[pair_index]`, meetings at counted activities.
    met: Vec<usize>,
    nodes: u64,
}

impl<'a> Search<'a> {
    fn new(plan: &'a SearchPlan, budget: &'a Budget<'a>) -> Self {
        let r = plan.rounds;
        Self {
            plan,
            budget,
            cells: vec![0; plan.teams * r],
            groups: vec![Vec::new(); r * r],
            visits: vec![0; plan.teams * r],
            met: vec![0; plan.teams * plan.teams],
            nodes: 0,
        }
    }

    /// Fills cell `(team, round)` and everything after it.
    ///
    /// Returns `Ok(true)` with the state left in place once every cell is
    /// filled, `Ok(false)` when the subtree has no solution.
    fn fill(&mut self, team: TeamId, round: usize) -> Result<bool, SolverFault> {
        let r = self.plan.rounds;
        if team == self.plan.teams {
            return Ok(self.capacities_exact());
        }
        if round == r {
            if !self.itinerary_complete(team) {
                return Ok(false);
            }
            return self.fill(team + 1, 0);
        }

        self.tick()?;

        let (floor, ceiling) = self.lex_bounds(team, round);
        let pinned = self.plan.pin(team, round);
        for activity in floor..=ceiling.min(r.saturating_sub(1)) {
            if pinned.is_some_and(|k| k != activity) || !self.admissible(team, round, activity) {
                continue;
            }
            self.place(team, round, activity);
            if self.fill(team, round + 1)? {
                return Ok(true);
            }
            self.unplace(team, round, activity);
        }
        Ok(false)
    }

    fn tick(&mut self) -> Result<(), SolverFault> {
        self.nodes += 1;
        if self.nodes % CHECK_INTERVAL == 0 {
            if let Some(fault) = self.budget.exhausted(self.nodes) {
                return Err(fault);
            }
        }
        if self.nodes % PROGRESS_INTERVAL == 0 {
            debug!(
                event = "solve_progress",
                nodes = self.nodes,
                elapsed_ms = self.budget.elapsed().as_millis() as u64,
            );
        }
        Ok(())
    }

    /// Activity range allowed by `LexOrder` against completed itineraries.
    fn lex_bounds(&self, team: TeamId, round: usize) -> (ActivityId, ActivityId) {
        let r = self.plan.rounds;
        let prefix = &self.cells[team * r..team * r + round];
        let tight = |other: TeamId| self.cells[other * r..other * r + round] == *prefix;

        let floor = self.plan.lower[team]
            .iter()
            .filter(|&&other| tight(other))
            .map(|&other| self.cells[other * r + round])
            .max()
            .unwrap_or(0);
        let ceiling = self.plan.upper[team]
            .iter()
            .filter(|&&other| tight(other))
            .map(|&other| self.cells[other * r + round])
            .min()
            .unwrap_or(usize::MAX);
        (floor, ceiling)
    }

    fn admissible(&self, team: TeamId, round: usize, activity: ActivityId) -> bool {
        let r = self.plan.rounds;
        if self.plan.visit_once[team * r + activity] && self.visits[team * r + activity] > 0 {
            return false;
        }
        let group = &self.groups[round * r + activity];
        if self.plan.capacity[round * r + activity].is_some_and(|cap| group.len() >= cap) {
            return false;
        }
        group.iter().all(|&other| match self.plan.pair(team, other) {
            Some(rule) if rule.counts(activity) => {
                self.met[pair_index(self.plan.teams, team, other)] < rule.limit
            }
            _ => true,
        })
    }

    fn place(&mut self, team: TeamId, round: usize, activity: ActivityId) {
        let r = self.plan.rounds;
        let t = self.plan.teams;
        self.cells[team * r + round] = activity;
        self.visits[team * r + activity] += 1;
        for &other in &self.groups[round * r + activity] {
            if self.plan.pair(team, other).is_some_and(|rule| rule.counts(activity)) {
                self.met[pair_index(t, team, other)] += 1;
            }
        }
        self.groups[round * r + activity].push(team);
    }

    fn unplace(&mut self, team: TeamId, round: usize, activity: ActivityId) {
        let r = self.plan.rounds;
        let t = self.plan.teams;
        self.groups[round * r + activity].pop();
        for &other in &self.groups[round * r + activity] {
            if self.plan.pair(team, other).is_some_and(|rule| rule.counts(activity)) {
                self.met[pair_index(t, team, other)] -= 1;
            }
        }
        self.visits[team * r + activity] -= 1;
    }

    /// Every visit-once activity of `team` has been visited.
    fn itinerary_complete(&self, team: TeamId) -> bool {
        let r = self.plan.rounds;
        (0..r).all(|k| !self.plan.visit_once[team * r + k] || self.visits[team * r + k] == 1)
    }

    fn capacities_exact(&self) -> bool {
        self.plan
            .capacity
            .iter()
            .zip(&self.groups)
            .all(|(cap, group)| cap.is_none_or(|cap| group.len() == cap))
    }
}
