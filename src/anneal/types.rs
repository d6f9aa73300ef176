//! Core trait for Simulated Annealing.

use rand::Rng;

/// Defines a Simulated Annealing problem with incremental move evaluation.
///
/// The problem owns neighbourhood generation and cost bookkeeping; the
/// runner handles temperature, acceptance and cooling.
///
/// # Minimization
///
/// SA minimizes the cost function. For maximization, negate the cost.
///
/// # Examples
///
/// ```
/// use rand::Rng;
/// use u_rotation::anneal::AnnealProblem;
///
/// /// Minimise the number of misplaced entries of a permutation.
/// struct Sort { n: usize }
///
/// impl AnnealProblem for Sort {
///     type State = Vec<usize>;
///     type Move = (usize, usize);
///
///     fn initial_state<R: Rng>(&self, _rng: &mut R) -> Vec<usize> {
///         (0..self.n).rev().collect()
///     }
///
///     fn cost(&self, p: &Vec<usize>) -> f64 {
///         p.iter().enumerate().filter(|&(i, &v)| i != v).count() as f64
///     }
///
///     fn propose<R: Rng>(&self, _p: &Vec<usize>, rng: &mut R) -> Option<(usize, usize)> {
///         let i = rng.random_range(0..self.n);
///         let j = rng.random_range(0..self.n);
///         (i != j).then_some((i, j))
///     }
///
///     fn delta(&self, p: &Vec<usize>, &(i, j): &(usize, usize)) -> f64 {
///         let mut q = p.clone();
///         q.swap(i, j);
///         self.cost(&q) - self.cost(p)
///     }
///
///     fn apply(&self, p: &mut Vec<usize>, &(i, j): &(usize, usize)) {
///         p.swap(i, j);
///     }
/// }
/// ```
pub trait AnnealProblem: Send + Sync {
    /// The search state.
    type State: Clone + Send;

    /// A move from one state to a neighbour.
    type Move;

    /// Creates a random initial state.
    fn initial_state<R: Rng>(&self, rng: &mut R) -> Self::State;

    /// Computes the cost of a state from scratch. Lower is better.
    fn cost(&self, state: &Self::State) -> f64;

    /// Samples a move, or `None` if the sample is a no-op.
    ///
    /// The neighbourhood must be connected: any state must be reachable
    /// from any other through a sequence of moves.
    fn propose<R: Rng>(&self, state: &Self::State, rng: &mut R) -> Option<Self::Move>;

    /// Cost change if `mv` were applied to `state`.
    fn delta(&self, state: &Self::State, mv: &Self::Move) -> f64;

    /// Applies `mv` in place.
    fn apply(&self, state: &mut Self::State, mv: &Self::Move);
}
