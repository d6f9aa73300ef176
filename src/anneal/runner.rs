//! SA execution loop.

use super::config::AnnealConfig;
use super::types::AnnealProblem;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of a Simulated Annealing run.
#[derive(Debug, Clone)]
pub struct AnnealResult<S: Clone> {
    /// The best state found.
    pub best: S,

    /// Cost of the best state.
    pub best_cost: f64,

    /// Total number of iterations (proposed moves, no-ops included).
    pub iterations: usize,

    /// Final temperature when the run stopped.
    pub final_temperature: f64,

    /// Number of accepted moves (including improvements).
    pub accepted_moves: usize,

    /// Number of improving moves.
    pub improving_moves: usize,

    /// Whether the stop callback ended the run.
    pub interrupted: bool,
}

impl<S: Clone> AnnealResult<S> {
    /// Whether the best cost reached `config.target_cost`.
    pub fn reached_target(&self, config: &AnnealConfig) -> bool {
        config.target_cost.is_some_and(|t| self.best_cost <= t)
    }
}

/// Executes the Simulated Annealing algorithm.
pub struct AnnealRunner;

impl AnnealRunner {
    /// Runs SA to completion.
    pub fn run<P: AnnealProblem>(
        problem: &P,
        config: &AnnealConfig,
    ) -> Result<AnnealResult<P::State>, String> {
        Self::run_until(problem, config, |_| false)
    }

    /// Runs SA with an optional cancellation token.
    pub fn run_with_cancel<P: AnnealProblem>(
        problem: &P,
        config: &AnnealConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<AnnealResult<P::State>, String> {
        Self::run_until(problem, config, |_| {
            cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
        })
    }

    /// Runs SA, asking `stop` before each temperature level whether to
    /// give up. `stop` receives the iterations done so far.
    pub fn run_until<P, F>(
        problem: &P,
        config: &AnnealConfig,
        mut stop: F,
    ) -> Result<AnnealResult<P::State>, String>
    where
        P: AnnealProblem,
        F: FnMut(usize) -> bool,
    {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(rand::random));
        let reached = |cost: f64| config.target_cost.is_some_and(|t| cost <= t);

        let mut current = problem.initial_state(&mut rng);
        let mut current_cost = problem.cost(&current);
        let mut best = current.clone();
        let mut best_cost = current_cost;

        let mut temperature = config.initial_temperature;
        let mut iterations = 0usize;
        let mut accepted_moves = 0usize;
        let mut improving_moves = 0usize;
        let mut interrupted = false;

        'levels: while temperature > config.min_temperature && !reached(best_cost) {
            if stop(iterations) {
                interrupted = true;
                break;
            }

            for _ in 0..config.iterations_per_temperature {
                if config.max_iterations > 0 && iterations >= config.max_iterations {
                    break 'levels;
                }
                iterations += 1;

                let Some(mv) = problem.propose(&current, &mut rng) else {
                    continue;
                };
                let delta = problem.delta(&current, &mv);

                // Metropolis acceptance criterion
                let accept = if delta < 0.0 {
                    improving_moves += 1;
                    true
                } else {
                    rng.random_range(0.0..1.0) < (-delta / temperature).exp()
                };

                if accept {
                    problem.apply(&mut current, &mv);
                    current_cost += delta;
                    accepted_moves += 1;

                    if current_cost < best_cost {
                        best = current.clone();
                        best_cost = current_cost;
                        if reached(best_cost) {
                            break 'levels;
                        }
                    }
                }
            }

            temperature *= config.cooling_rate;
        }

        Ok(AnnealResult {
            best,
            best_cost,
            iterations,
            final_temperature: temperature,
            accepted_moves,
            improving_moves,
            interrupted,
        })
    }
}
