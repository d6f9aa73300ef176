//! SA configuration.

/// Configuration for one annealing run.
///
/// Cooling is geometric: `T_{k+1} = cooling_rate * T_k`. The defaults
/// suit costs that count unit violations, where a worsening move costs 1
/// or 2: the run starts warm enough to accept such moves often and stops
/// once they become rare, so a stalled run ends early and can be
/// restarted.
///
/// # Examples
///
/// ```
/// use u_rotation::anneal::AnnealConfig;
///
/// let config = AnnealConfig::default()
///     .with_initial_temperature(2.0)
///     .with_min_temperature(0.2)
///     .with_cooling_rate(0.999)
///     .with_target_cost(0.0)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealConfig {
    /// Initial temperature.
    pub initial_temperature: f64,

    /// The run stops when the temperature drops to this value.
    pub min_temperature: f64,

    /// Geometric cooling factor in (0, 1). Higher = slower cooling.
    pub cooling_rate: f64,

    /// Iterations at each temperature level.
    pub iterations_per_temperature: usize,

    /// Maximum total iterations (hard budget). 0 = no limit.
    pub max_iterations: usize,

    /// Stop as soon as the best cost is at or below this value.
    pub target_cost: Option<f64>,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 1.0,
            min_temperature: 0.3,
            cooling_rate: 0.998,
            iterations_per_temperature: 100,
            max_iterations: 0,
            target_cost: None,
            seed: None,
        }
    }
}

impl AnnealConfig {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate;
        self
    }

    pub fn with_iterations_per_temperature(mut self, n: usize) -> Self {
        self.iterations_per_temperature = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_target_cost(mut self, cost: f64) -> Self {
        self.target_cost = Some(cost);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_temperature <= 0.0 {
            return Err("initial_temperature must be positive".into());
        }
        if self.min_temperature <= 0.0 {
            return Err("min_temperature must be positive".into());
        }
        if self.min_temperature >= self.initial_temperature {
            return Err("min_temperature must be less than initial_temperature".into());
        }
        if self.iterations_per_temperature == 0 {
            return Err("iterations_per_temperature must be positive".into());
        }
        if self.cooling_rate <= 0.0 || self.cooling_rate >= 1.0 {
            return Err(format!(
                "cooling_rate must be in (0, 1), got {}",
                self.cooling_rate
            ));
        }
        Ok(())
    }
}
