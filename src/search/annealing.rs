//! Simulated annealing over round partitions.
//!
//! Each round is kept as a partition of the teams into groups of exactly
//! the required capacity, so capacities and one-activity-per-round hold
//! throughout. A move swaps two unpinned teams of different groups in one
//! round. The cost counts the remaining violations:
//!
//! ```text
//! cost = Σ |visits(team, activity) - 1|   over visit-once pairs
//!      + Σ max(0, meetings(a, b) - limit) over limited pairs
//! ```
//!
//! Proposals are conflict-directed. A sample of the cells whose team takes
//! part in a violation is priced against every swap partner in the same
//! round, and the cheapest swap that is not tabu is proposed. An accepted
//! swap stays tabu for a few moves unless it would reach a new best cost.
//! When no movable team is in conflict a random swap is proposed.
//!
//! A run that reaches cost 0 is a schedule. Local search cannot prove
//! infeasibility, so running out of restarts is a fault, never UNSAT.

use super::plan::{pair_index, PairRule, PlanError, SearchPlan};
use crate::anneal::{AnnealConfig, AnnealProblem, AnnealRunner};
use crate::cp::{
    ActivityId, Assignment, Budget, CpModel, CpSolver, SolveLimits, SolveOutcome, SolveReport,
    SolveStats, TeamId,
};
use crate::error::SolverFault;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Accepted moves a swap stays tabu, before the random extension.
const DEFAULT_TABU_TENURE: usize = 5;
/// Conflicted cells priced per proposal.
const DEFAULT_SAMPLE_SIZE: usize = 16;

/// Stochastic local-search backend.
///
/// Runs up to `restarts` annealing runs, each seeded from the base seed.
/// With the `parallel` feature the runs execute on rayon and the first
/// converged run wins.
///
/// A run cools from 4.0 to 1.0 by a factor of 0.999 every 200 moves, so it
/// lasts at most about 277k moves.
///
/// # Examples
///
/// ```
/// use u_rotation::cp::{CpSolver, SolveLimits};
/// use u_rotation::rotation::{ModelBuilder, RotationParams};
/// use u_rotation::search::AnnealingSolver;
///
/// let params = RotationParams::new(8, 4, 2).unwrap();
/// let model = ModelBuilder::new(&params).build();
/// let solver = AnnealingSolver::new().with_seed(7).with_restarts(8);
/// let report = solver.solve(&model, &SolveLimits::default());
/// assert!(report.outcome.is_satisfiable());
/// ```
#[derive(Debug, Clone)]
pub struct AnnealingSolver {
    config: AnnealConfig,
    restarts: usize,
    seed: u64,
    tabu_tenure: usize,
    sample_size: usize,
}

impl Default for AnnealingSolver {
    fn default() -> Self {
        Self {
            config: AnnealConfig::default()
                .with_initial_temperature(4.0)
                .with_min_temperature(1.0)
                .with_cooling_rate(0.999)
                .with_iterations_per_temperature(200)
                .with_target_cost(0.0),
            restarts: 8,
            seed: 42,
            tabu_tenure: DEFAULT_TABU_TENURE,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl AnnealingSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The per-run configuration.
    pub fn config(&self) -> &AnnealConfig {
        &self.config
    }

    /// Replaces the per-run configuration. The target cost is always 0 and
    /// the seed is derived per restart.
    pub fn with_config(mut self, config: AnnealConfig) -> Self {
        self.config = config.with_target_cost(0.0);
        self
    }

    /// Number of annealing runs, at least 1.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Accepted moves a swap stays tabu. Each swap draws its tenure from
    /// `tenure..=2 * tenure`; 0 disables the tabu list.
    pub fn with_tabu_tenure(mut self, tenure: usize) -> Self {
        self.tabu_tenure = tenure;
        self
    }

    /// Conflicted cells priced per proposal, at least 1.
    pub fn with_sample_size(mut self, cells: usize) -> Self {
        self.sample_size = cells.max(1);
        self
    }

    /// Seed of run `restart`.
    fn seed_for(&self, restart: usize) -> u64 {
        self.seed
            .wrapping_add((restart as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

impl CpSolver for AnnealingSolver {
    fn name(&self) -> &'static str {
        "annealing"
    }

    fn solve(&self, model: &CpModel, limits: &SolveLimits) -> SolveReport {
        let budget = limits.start();
        let done = |outcome: SolveOutcome, nodes: u64, restarts: usize| SolveReport {
            outcome,
            stats: SolveStats {
                nodes,
                elapsed: budget.elapsed(),
                restarts,
            },
        };

        let problem = match SearchPlan::compile(model).and_then(PartitionProblem::new) {
            Ok(problem) => problem.with_tabu(self.tabu_tenure, self.sample_size),
            Err(PlanError::Contradiction(reason)) => {
                debug!(event = "contradiction", reason = %reason);
                return done(SolveOutcome::Unsatisfiable, 0, 0);
            }
            Err(PlanError::Unsupported(reason)) => {
                return done(SolveOutcome::Fault(SolverFault::Internal(reason)), 0, 0);
            }
        };

        if let Some(fault) = budget.exhausted(0) {
            return done(SolveOutcome::Fault(fault), 0, 0);
        }

        let run = self.run_restarts(&problem, &budget);
        let outcome = match run.result {
            Ok(partition) => {
                let rows = problem.canonical_rows(&partition);
                let assignment = Assignment::from_itineraries(&model.index, &rows);
                match model.first_violation(&assignment) {
                    None => SolveOutcome::Satisfiable(assignment),
                    Some(violated) => SolveOutcome::Fault(SolverFault::Internal(format!(
                        "annealing produced an assignment violating `{violated}`"
                    ))),
                }
            }
            Err(fault) => SolveOutcome::Fault(fault),
        };
        done(outcome, run.nodes, run.runs)
    }
}

/// What the restart loop produced.
struct RestartOutcome {
    result: Result<Partition, SolverFault>,
    nodes: u64,
    runs: usize,
}

impl AnnealingSolver {
    #[cfg(not(feature = "parallel"))]
    fn run_restarts(&self, problem: &PartitionProblem, budget: &Budget<'_>) -> RestartOutcome {
        let mut nodes = 0u64;
        let mut best_cost = usize::MAX;

        for restart in 0..self.restarts {
            let config = self.config.clone().with_seed(self.seed_for(restart));
            debug!(event = "restart", restart, seed = self.seed_for(restart));

            let mut fault = None;
            let result = AnnealRunner::run_until(problem, &config, |iterations| {
                fault = budget.exhausted(nodes + iterations as u64);
                fault.is_some()
            });
            let runs = restart + 1;
            let result = match result {
                Ok(result) => result,
                Err(reason) => {
                    return RestartOutcome {
                        result: Err(SolverFault::Internal(reason)),
                        nodes,
                        runs,
                    }
                }
            };
            nodes += result.iterations as u64;

            if let Some(fault) = fault {
                return RestartOutcome {
                    result: Err(fault),
                    nodes,
                    runs,
                };
            }
            if result.reached_target(&config) {
                return RestartOutcome {
                    result: Ok(result.best),
                    nodes,
                    runs,
                };
            }
            best_cost = best_cost.min(result.best_cost as usize);
            debug!(
                event = "restart_end",
                restart,
                best_cost,
                iterations = result.iterations,
            );
        }

        RestartOutcome {
            result: Err(SolverFault::NotConverged {
                restarts: self.restarts,
                best_cost,
            }),
            nodes,
            runs: self.restarts,
        }
    }

    /// Node limits are approximate here: a run only adds its iterations to
    /// the shared count when it ends.
    #[cfg(feature = "parallel")]
    fn run_restarts(&self, problem: &PartitionProblem, budget: &Budget<'_>) -> RestartOutcome {
        use rayon::prelude::*;
        use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
        use std::sync::Mutex;

        let finished = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let runs = AtomicUsize::new(0);
        let best_cost = AtomicUsize::new(usize::MAX);
        let fault: Mutex<Option<SolverFault>> = Mutex::new(None);

        let record = |f: SolverFault| {
            finished.store(true, Ordering::Relaxed);
            if let Ok(mut slot) = fault.lock() {
                slot.get_or_insert(f);
            }
        };

        let found = (0..self.restarts).into_par_iter().find_map_any(|restart| {
            if finished.load(Ordering::Relaxed) {
                return None;
            }
            runs.fetch_add(1, Ordering::Relaxed);
            let config = self.config.clone().with_seed(self.seed_for(restart));
            debug!(event = "restart", restart, seed = self.seed_for(restart));

            let mut stopped = None;
            let result = AnnealRunner::run_until(problem, &config, |iterations| {
                if finished.load(Ordering::Relaxed) {
                    return true;
                }
                stopped = budget.exhausted(nodes.load(Ordering::Relaxed) + iterations as u64);
                stopped.is_some()
            });

            match result {
                Err(reason) => {
                    record(SolverFault::Internal(reason));
                    None
                }
                Ok(result) => {
                    nodes.fetch_add(result.iterations as u64, Ordering::Relaxed);
                    best_cost.fetch_min(result.best_cost as usize, Ordering::Relaxed);
                    if let Some(f) = stopped {
                        record(f);
                        None
                    } else if result.reached_target(&config) {
                        finished.store(true, Ordering::Relaxed);
                        Some(result.best)
                    } else {
                        None
                    }
                }
            }
        });

        let runs = runs.into_inner();
        let result = match found {
            Some(best) => Ok(best),
            None => Err(fault
                .into_inner()
                .ok()
                .flatten()
                .unwrap_or(SolverFault::NotConverged {
                    restarts: runs,
                    best_cost: best_cost.into_inner(),
                })),
        };
        RestartOutcome {
            result,
            nodes: nodes.into_inner(),
            runs,
        }
    }
}

/// Round partitions, the counters the cost is derived from, and the tabu
/// list of the trajectory.
#[derive(Debug, Clone)]
struct Partition {
    /// `[round * teams + team]`
    cells: Vec<ActivityId>,
    /// `[team * rounds + activity]`
    visits: Vec<u32>,
    /// `[pair_index]`, meetings at counted activities.
    met: Vec<u32>,
    /// `[round * rounds + activity]`, the teams of each group.
    members: Vec<Vec<TeamId>>,
    /// `[round * teams + team]`, position of the team in its group.
    slot: Vec<usize>,
    /// `[(round * teams + a) * teams + b]`, move count until which swapping
    /// `a` and `b` in `round` is tabu.
    tabu: Vec<u64>,
    /// Accepted moves so far.
    moves: u64,
    cost: i64,
    best: i64,
}

/// Swap the activities of teams `a` and `b` in `round`.
#[derive(Debug, Clone, Copy)]
struct Swap {
    round: usize,
    a: TeamId,
    b: TeamId,
    /// Accepted moves the swap stays tabu once applied.
    tenure: usize,
}

struct PartitionProblem {
    plan: SearchPlan,
    /// Unpinned teams per round.
    movable: Vec<Vec<TeamId>>,
    /// Rounds with at least two unpinned teams.
    active_rounds: Vec<usize>,
    /// Activity slots per round left over after pinned teams.
    free_slots: Vec<Vec<ActivityId>>,
    tenure: usize,
    sample_size: usize,
}

impl PartitionProblem {
    fn new(plan: SearchPlan) -> Result<Self, PlanError> {
        let (t, r) = (plan.teams, plan.rounds);
        let mut movable = Vec::with_capacity(r);
        let mut free_slots = Vec::with_capacity(r);

        for round in 0..r {
            let mut left = Vec::with_capacity(r);
            for activity in 0..r {
                match plan.capacity[round * r + activity] {
                    Some(cap) => left.push(cap),
                    None => {
                        return Err(PlanError::Unsupported(format!(
                            "annealing needs a capacity for activity {activity} in round {round}"
                        )))
                    }
                }
            }
            let total: usize = left.iter().sum();
            if total != t {
                return Err(PlanError::Contradiction(format!(
                    "capacities of round {round} add up to {total}, not {t} teams"
                )));
            }

            let mut free = Vec::new();
            for team in 0..t {
                match plan.pin(team, round) {
                    Some(activity) => {
                        if left[activity] == 0 {
                            return Err(PlanError::Contradiction(format!(
                                "too many teams pinned to activity {activity} in round {round}"
                            )));
                        }
                        left[activity] -= 1;
                    }
                    None => free.push(team),
                }
            }
            movable.push(free);
            free_slots.push(
                left.iter()
                    .enumerate()
                    .flat_map(|(activity, &n)| std::iter::repeat_n(activity, n))
                    .collect(),
            );
        }

        let active_rounds = (0..r).filter(|&j| movable[j].len() >= 2).collect();
        Ok(Self {
            plan,
            movable,
            active_rounds,
            free_slots,
            tenure: DEFAULT_TABU_TENURE,
            sample_size: DEFAULT_SAMPLE_SIZE,
        })
    }

    fn with_tabu(mut self, tenure: usize, sample_size: usize) -> Self {
        self.tenure = tenure;
        self.sample_size = sample_size.max(1);
        self
    }

    fn rule(&self, a: TeamId, b: TeamId) -> Option<&PairRule> {
        self.plan.pair(a, b)
    }

    /// Cost contribution of `team` visiting `activity` `visits` times.
    fn visit_cost(&self, team: TeamId, activity: ActivityId, visits: u32) -> i64 {
        if self.plan.visit_once[team * self.plan.rounds + activity] {
            (i64::from(visits) - 1).abs()
        } else {
            0
        }
    }

    /// Cost change of moving `visits` by `step`.
    fn visit_delta(&self, state: &Partition, team: TeamId, activity: ActivityId, step: i32) -> i64 {
        let v = state.visits[team * self.plan.rounds + activity];
        self.visit_cost(team, activity, v.saturating_add_signed(step)) - self.visit_cost(team, activity, v)
    }

    /// Cost change of the `a`-`b` meeting count moving by `step` at `activity`.
    fn meeting_delta(&self, state: &Partition, a: TeamId, b: TeamId, activity: ActivityId, step: i32) -> i64 {
        match self.rule(a, b) {
            Some(rule) if rule.counts(activity) => {
                let m = state.met[pair_index(self.plan.teams, a, b)];
                let excess = |m: u32| i64::from(m.saturating_sub(rule.limit as u32));
                excess(m.saturating_add_signed(step)) - excess(m)
            }
            _ => 0,
        }
    }

    /// Cost change of swapping `a` and `b` in `round`. They must sit in
    /// different groups.
    fn swap_delta(&self, state: &Partition, round: usize, a: TeamId, b: TeamId) -> i64 {
        let (t, r) = (self.plan.teams, self.plan.rounds);
        let (ka, kb) = (state.cells[round * t + a], state.cells[round * t + b]);

        let mut delta = self.visit_delta(state, a, ka, -1)
            + self.visit_delta(state, a, kb, 1)
            + self.visit_delta(state, b, kb, -1)
            + self.visit_delta(state, b, ka, 1);

        for &other in &state.members[round * r + ka] {
            if other != a {
                delta += self.meeting_delta(state, a, other, ka, -1)
                    + self.meeting_delta(state, b, other, ka, 1);
            }
        }
        for &other in &state.members[round * r + kb] {
            if other != b {
                delta += self.meeting_delta(state, b, other, kb, -1)
                    + self.meeting_delta(state, a, other, kb, 1);
            }
        }
        delta
    }

    /// Whether `team` takes part in a violation through its cell in `round`.
    fn conflicted(&self, state: &Partition, round: usize, team: TeamId) -> bool {
        let (t, r) = (self.plan.teams, self.plan.rounds);
        let activity = state.cells[round * t + team];
        if self.visit_cost(team, activity, state.visits[team * r + activity]) != 0 {
            return true;
        }
        state.members[round * r + activity].iter().any(|&other| {
            other != team
                && self.rule(team, other).is_some_and(|rule| {
                    rule.counts(activity)
                        && state.met[pair_index(t, team, other)] > rule.limit as u32
                })
        })
    }

    fn is_tabu(&self, state: &Partition, round: usize, a: TeamId, b: TeamId) -> bool {
        let t = self.plan.teams;
        state.tabu[(round * t + a) * t + b] > state.moves
    }

    fn draw_tenure<R: Rng>(&self, rng: &mut R) -> usize {
        self.tenure + rng.random_range(0..=self.tenure)
    }

    fn random_swap<R: Rng>(&self, state: &Partition, rng: &mut R) -> Option<Swap> {
        if self.active_rounds.is_empty() {
            return None;
        }
        let round = self.active_rounds[rng.random_range(0..self.active_rounds.len())];
        let teams = &self.movable[round];
        let a = teams[rng.random_range(0..teams.len())];
        let b = teams[rng.random_range(0..teams.len())];
        let t = self.plan.teams;
        (state.cells[round * t + a] != state.cells[round * t + b]).then(|| Swap {
            round,
            a,
            b,
            tenure: self.draw_tenure(rng),
        })
    }

    /// Builds the visit, meeting and group tables for `cells`.
    fn with_counters(&self, cells: Vec<ActivityId>) -> Partition {
        let (t, r) = (self.plan.teams, self.plan.rounds);
        let mut visits = vec![0; t * r];
        let mut met = vec![0; t * t];
        let mut members = vec![Vec::new(); r * r];
        let mut slot = vec![0; r * t];
        for round in 0..r {
            let row = &cells[round * t..(round + 1) * t];
            for a in 0..t {
                visits[a * r + row[a]] += 1;
                let group = &mut members[round * r + row[a]];
                slot[round * t + a] = group.len();
                group.push(a);
                for b in a + 1..t {
                    if row[a] == row[b] && self.rule(a, b).is_some_and(|rule| rule.counts(row[a])) {
                        met[pair_index(t, a, b)] += 1;
                    }
                }
            }
        }
        let mut state = Partition {
            cells,
            visits,
            met,
            members,
            slot,
            tabu: vec![0; r * t * t],
            moves: 0,
            cost: 0,
            best: 0,
        };
        state.cost = self.cost(&state) as i64;
        state.best = state.cost;
        state
    }

    /// Itineraries with interchangeable teams sorted along `LexOrder`.
    fn canonical_rows(&self, state: &Partition) -> Vec<Vec<ActivityId>> {
        let (t, r) = (self.plan.teams, self.plan.rounds);
        let mut rows: Vec<Vec<ActivityId>> = (0..t)
            .map(|team| (0..r).map(|round| state.cells[round * t + team]).collect())
            .collect();

        for _ in 0..=self.plan.lex_pairs.len() {
            let mut changed = false;
            for &(first, second) in &self.plan.lex_pairs {
                if rows[first] > rows[second] && self.plan.interchangeable(first, second) {
                    rows.swap(first, second);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        rows
    }
}

impl AnnealProblem for PartitionProblem {
    type State = Partition;
    type Move = Swap;

    fn initial_state<R: Rng>(&self, rng: &mut R) -> Partition {
        let (t, r) = (self.plan.teams, self.plan.rounds);
        let mut cells = vec![0; r * t];
        for round in 0..r {
            for team in 0..t {
                if let Some(activity) = self.plan.pin(team, round) {
                    cells[round * t + team] = activity;
                }
            }
            let mut slots = self.free_slots[round].clone();
            slots.shuffle(rng);
            for (&team, activity) in self.movable[round].iter().zip(slots) {
                cells[round * t + team] = activity;
            }
        }
        self.with_counters(cells)
    }

    fn cost(&self, state: &Partition) -> f64 {
        let (t, r) = (self.plan.teams, self.plan.rounds);
        let mut cost = 0i64;
        for team in 0..t {
            for activity in 0..r {
                cost += self.visit_cost(team, activity, state.visits[team * r + activity]);
            }
        }
        for a in 0..t {
            for b in a + 1..t {
                if let Some(rule) = self.rule(a, b) {
                    cost += i64::from(state.met[pair_index(t, a, b)].saturating_sub(rule.limit as u32));
                }
            }
        }
        cost as f64
    }

    fn propose<R: Rng>(&self, state: &Partition, rng: &mut R) -> Option<Swap> {
        let t = self.plan.teams;
        let mut conflicts: Vec<(usize, TeamId)> = self
            .active_rounds
            .iter()
            .flat_map(|&round| self.movable[round].iter().map(move |&team| (round, team)))
            .filter(|&(round, team)| self.conflicted(state, round, team))
            .collect();
        if conflicts.is_empty() {
            return self.random_swap(state, rng);
        }

        let (sample, _) = conflicts.partial_shuffle(rng, self.sample_size);
        let mut best: Option<(i64, usize, TeamId, TeamId)> = None;
        let mut ties = 0u32;
        for &(round, a) in sample.iter() {
            let activity = state.cells[round * t + a];
            for &b in &self.movable[round] {
                if state.cells[round * t + b] == activity {
                    continue;
                }
                let delta = self.swap_delta(state, round, a, b);
                // Aspiration: a tabu swap is allowed when it beats the best cost.
                if self.is_tabu(state, round, a, b) && state.cost + delta >= state.best {
                    continue;
                }
                match best {
                    Some((d, ..)) if delta > d => continue,
                    Some((d, ..)) if delta == d => {
                        ties += 1;
                        if rng.random_range(0..ties) != 0 {
                            continue;
                        }
                    }
                    _ => ties = 1,
                }
                best = Some((delta, round, a, b));
            }
        }

        best.map(|(_, round, a, b)| Swap {
            round,
            a,
            b,
            tenure: self.draw_tenure(rng),
        })
    }

    fn delta(&self, state: &Partition, mv: &Swap) -> f64 {
        self.swap_delta(state, mv.round, mv.a, mv.b) as f64
    }

    fn apply(&self, state: &mut Partition, mv: &Swap) {
        let (t, r) = (self.plan.teams, self.plan.rounds);
        let delta = self.swap_delta(state, mv.round, mv.a, mv.b);
        let base = mv.round * t;
        let (ka, kb) = (state.cells[base + mv.a], state.cells[base + mv.b]);
        let (group_a, group_b) = (mv.round * r + ka, mv.round * r + kb);

        for &other in &state.members[group_a] {
            if other == mv.a {
                continue;
            }
            if self.rule(mv.a, other).is_some_and(|rule| rule.counts(ka)) {
                state.met[pair_index(t, mv.a, other)] -= 1;
            }
            if self.rule(mv.b, other).is_some_and(|rule| rule.counts(ka)) {
                state.met[pair_index(t, mv.b, other)] += 1;
            }
        }
        for &other in &state.members[group_b] {
            if other == mv.b {
                continue;
            }
            if self.rule(mv.b, other).is_some_and(|rule| rule.counts(kb)) {
                state.met[pair_index(t, mv.b, other)] -= 1;
            }
            if self.rule(mv.a, other).is_some_and(|rule| rule.counts(kb)) {
                state.met[pair_index(t, mv.a, other)] += 1;
            }
        }

        state.members[group_a][state.slot[base + mv.a]] = mv.b;
        state.members[group_b][state.slot[base + mv.b]] = mv.a;
        state.slot.swap(base + mv.a, base + mv.b);

        state.visits[mv.a * r + ka] -= 1;
        state.visits[mv.a * r + kb] += 1;
        state.visits[mv.b * r + kb] -= 1;
        state.visits[mv.b * r + ka] += 1;
        state.cells[base + mv.a] = kb;
        state.cells[base + mv.b] = ka;

        state.moves += 1;
        let expires = state.moves + mv.tenure as u64;
        state.tabu[(base + mv.a) * t + mv.b] = expires;
        state.tabu[(base + mv.b) * t + mv.a] = expires;
        state.cost += delta;
        state.best = state.best.min(state.cost);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::ConstraintKind;
    use crate::rotation::{extract, validate_solution, ModelBuilder, RotationParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    fn problem(teams: usize, activities: usize, capacity: usize) -> PartitionProblem {
        let params = RotationParams::new(teams, activities, capacity).unwrap();
        let plan = SearchPlan::compile(&ModelBuilder::new(&params).build()).unwrap();
        PartitionProblem::new(plan).unwrap()
    }

    fn assert_scheduled(teams: usize, activities: usize, capacity: usize) {
        let params = RotationParams::new(teams, activities, capacity).unwrap();
        let model = ModelBuilder::new(&params).build();
        let limits = SolveLimits::default().with_time_limit(Duration::from_secs(600));
        let report = AnnealingSolver::new().solve(&model, &limits);
        let SolveOutcome::Satisfiable(assignment) = report.outcome else {
            panic!("{teams}/{activities}/{capacity}: {:?}", report.outcome);
        };
        let solution = extract(&model.index, &assignment).unwrap();
        assert!(validate_solution(&solution, &params).is_ok());
    }

    /// Checks the incremental tables against a rebuild from the cells.
    fn assert_tables_consistent(p: &PartitionProblem, state: &Partition) {
        let fresh = p.with_counters(state.cells.clone());
        assert_eq!(state.visits, fresh.visits);
        assert_eq!(state.met, fresh.met);
        assert_eq!(state.cost as f64, p.cost(state));
        let sorted = |members: &[Vec<TeamId>]| {
            members
                .iter()
                .map(|group| {
                    let mut group = group.clone();
                    group.sort_unstable();
                    group
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(sorted(&state.members), sorted(&fresh.members));
        let t = p.plan.teams;
        for round in 0..p.plan.rounds {
            for team in 0..t {
                let group = &state.members[round * p.plan.rounds + state.cells[round * t + team]];
                assert_eq!(group[state.slot[round * t + team]], team);
            }
        }
    }

    // ---- move bookkeeping ----

    #[test]
    fn test_pins_fix_cells() {
        let p = problem(8, 4, 2);
        assert!(p.movable[0].is_empty());
        assert_eq!(p.movable[1], (1..8).collect::<Vec<_>>());
        assert_eq!(p.active_rounds, vec![1, 2, 3]);
        // Round 1: team 0 takes one of the two activity-1 slots.
        assert_eq!(p.free_slots[1], vec![0, 0, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_initial_state_respects_partition() {
        let p = problem(12, 4, 3);
        let state = p.initial_state(&mut StdRng::seed_from_u64(3));
        for round in 0..4 {
            for activity in 0..4 {
                let n = (0..12)
                    .filter(|&team| state.cells[round * 12 + team] == activity)
                    .count();
                assert_eq!(n, 3);
            }
            assert_eq!(state.cells[round * 12], round);
        }
    }

    #[test]
    fn test_delta_matches_recomputed_cost() {
        let p = problem(12, 4, 3);
        let mut rng = StdRng::seed_from_u64(11);
        let mut state = p.initial_state(&mut rng);
        let mut cost = p.cost(&state);

        for _ in 0..500 {
            let Some(mv) = p.propose(&state, &mut rng) else {
                continue;
            };
            let delta = p.delta(&state, &mv);
            p.apply(&mut state, &mv);
            cost += delta;
            assert_eq!(cost, p.cost(&state));
            assert_tables_consistent(&p, &state);
        }
        assert!(state.moves > 0);
        assert!(state.best <= state.cost);
    }

    #[test]
    fn test_proposals_start_from_conflicts() {
        let p = problem(12, 4, 3);
        let mut rng = StdRng::seed_from_u64(5);
        let state = p.initial_state(&mut rng);
        assert!(state.cost > 0);

        for _ in 0..50 {
            let mv = p.propose(&state, &mut rng).unwrap();
            assert!(p.conflicted(&state, mv.round, mv.a));
            assert_ne!(state.cells[mv.round * 12 + mv.a], state.cells[mv.round * 12 + mv.b]);
            assert!((5..=10).contains(&mv.tenure));
        }
    }

    #[test]
    fn test_applied_swap_is_tabu() {
        let p = problem(12, 4, 3);
        let mut rng = StdRng::seed_from_u64(8);
        let mut state = p.initial_state(&mut rng);
        let mv = Swap {
            tenure: 3,
            ..p.propose(&state, &mut rng).unwrap()
        };
        p.apply(&mut state, &mv);

        assert!(p.is_tabu(&state, mv.round, mv.a, mv.b));
        assert!(p.is_tabu(&state, mv.round, mv.b, mv.a));
        state.moves += 3;
        assert!(!p.is_tabu(&state, mv.round, mv.a, mv.b));
    }

    #[test]
    fn test_solved_state_proposes_random_swaps() {
        let params = RotationParams::new(8, 4, 2).unwrap();
        let model = ModelBuilder::new(&params).build();
        let SolveOutcome::Satisfiable(assignment) = AnnealingSolver::new()
            .solve(&model, &SolveLimits::default())
            .outcome
        else {
            panic!("8/4/2 not scheduled");
        };
        let solution = extract(&model.index, &assignment).unwrap();

        let p = problem(8, 4, 2);
        let cells = (0..4)
            .flat_map(|round| (0..8).map(move |team| (round, team)))
            .map(|(round, team)| solution.activity_of(team, round).unwrap())
            .collect();
        let state = p.with_counters(cells);
        assert_eq!(state.cost, 0);

        let mut rng = StdRng::seed_from_u64(1);
        let proposed = (0..20).filter_map(|_| p.propose(&state, &mut rng)).count();
        assert!(proposed > 0);
    }

    // ---- solving ----

    #[test]
    fn test_small_instances_scheduled() {
        assert_scheduled(8, 4, 2);
        assert_scheduled(12, 4, 3);
    }

    #[test]
    fn test_reference_instances_scheduled() {
        assert_scheduled(15, 5, 3);
        assert_scheduled(24, 6, 4);
    }

    #[test]
    fn test_tabu_settings_clamped() {
        let solver = AnnealingSolver::new().with_tabu_tenure(0).with_sample_size(0);
        assert_eq!(solver.tabu_tenure, 0);
        assert_eq!(solver.sample_size, 1);
    }

    #[test]
    fn test_not_converged_on_infeasible() {
        let params = RotationParams::new(9, 3, 3).unwrap();
        let model = ModelBuilder::new(&params).build();
        let report = AnnealingSolver::new()
            .with_config(AnnealConfig::default().with_max_iterations(2_000))
            .with_restarts(2)
            .solve(&model, &SolveLimits::default());
        assert!(matches!(
            report.outcome,
            SolveOutcome::Fault(SolverFault::NotConverged { restarts: 2, best_cost }) if best_cost > 0
        ));
        assert_eq!(report.stats.restarts, 2);
    }

    #[test]
    fn test_node_limit() {
        let params = RotationParams::new(24, 6, 4).unwrap();
        let model = ModelBuilder::new(&params).build();
        let limits = SolveLimits::default().with_node_limit(50);
        let report = AnnealingSolver::new().solve(&model, &limits);
        assert!(matches!(
            report.outcome,
            SolveOutcome::Fault(SolverFault::NodeLimit { .. })
        ));
    }

    #[test]
    fn test_cancelled() {
        let params = RotationParams::new(8, 4, 2).unwrap();
        let model = ModelBuilder::new(&params).build();
        let limits = SolveLimits::default().with_cancel(Arc::new(AtomicBool::new(true)));
        let report = AnnealingSolver::new().solve(&model, &limits);
        assert_eq!(report.outcome, SolveOutcome::Fault(SolverFault::Cancelled));
    }

    #[test]
    fn test_requires_capacities() {
        let params = RotationParams::new(8, 4, 2).unwrap();
        let mut model = ModelBuilder::new(&params).build();
        model
            .constraints
            .retain(|c| c.kind() != ConstraintKind::Capacity);
        let report = AnnealingSolver::new().solve(&model, &SolveLimits::default());
        assert!(matches!(
            report.outcome,
            SolveOutcome::Fault(SolverFault::Internal(_))
        ));
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_seed_reproducible() {
        let params = RotationParams::new(8, 4, 2).unwrap();
        let model = ModelBuilder::new(&params).build();
        let solver = AnnealingSolver::new().with_seed(5);
        let first = solver.solve(&model, &SolveLimits::default());
        let second = solver.solve(&model, &SolveLimits::default());
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.stats.nodes, second.stats.nodes);
    }
}
