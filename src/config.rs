//! Run configuration.
//!
//! Load the schedule dimensions, meeting policy, symmetry breaking, solver
//! choice and display names from TOML. Only `[schedule]` is required.
//!
//! # Examples
//!
//! ```
//! use u_rotation::config::{Backend, RotationConfig};
//! use std::time::Duration;
//!
//! let config = RotationConfig::from_toml_str(r#"
//!     [schedule]
//!     teams = 24
//!     capacity = 4
//!
//!     [meetings]
//!     no_conflict = "none"
//!
//!     [solver]
//!     backend = "annealing"
//!     time_limit_seconds = 60
//! "#).unwrap();
//!
//! let params = config.params().unwrap();
//! assert_eq!(params.activities(), 6);
//! assert_eq!(params.no_conflict_activity(), None);
//! assert_eq!(config.solver.backend, Backend::Annealing);
//! assert_eq!(config.limits().time_limit, Some(Duration::from_secs(60)));
//! ```

use crate::cp::{ActivityId, CpSolver, SolveLimits};
use crate::error::ConfigError;
use crate::render::Names;
use crate::rotation::{Exemption, MeetingPolicy, RotationParams, SymmetryBreaking};
use crate::search::{AnnealingSolver, BacktrackingSolver};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RotationConfig {
    /// Schedule dimensions.
    pub schedule: ScheduleConfig,

    /// Meeting policy.
    #[serde(default)]
    pub meetings: MeetingsConfig,

    /// Symmetry breaking switches.
    #[serde(default)]
    pub symmetry: SymmetryBreaking,

    /// Backend and limits.
    #[serde(default)]
    pub solver: SolverSettings,

    /// Display names.
    #[serde(default)]
    pub names: Names,
}

/// `[schedule]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScheduleConfig {
    pub teams: usize,
    /// Derived as `teams / capacity` when omitted.
    #[serde(default)]
    pub activities: Option<usize>,
    pub capacity: usize,
}

/// `[meetings]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MeetingsConfig {
    pub limit: usize,
    /// Omitted: the last activity.
    pub no_conflict: Option<NoConflict>,
}

impl Default for MeetingsConfig {
    fn default() -> Self {
        Self {
            limit: 1,
            no_conflict: None,
        }
    }
}

/// `no_conflict = 5`, `no_conflict = "last"` or `no_conflict = "none"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NoConflict {
    Activity(ActivityId),
    Keyword(NoConflictKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoConflictKeyword {
    Last,
    None,
}

impl MeetingsConfig {
    pub fn policy(&self) -> MeetingPolicy {
        let exemption = match self.no_conflict {
            None | Some(NoConflict::Keyword(NoConflictKeyword::Last)) => Exemption::Last,
            Some(NoConflict::Keyword(NoConflictKeyword::None)) => Exemption::None,
            Some(NoConflict::Activity(k)) => Exemption::Activity(k),
        };
        MeetingPolicy::default()
            .with_limit(self.limit)
            .with_exemption(exemption)
    }
}

/// Solver backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Exact search; proves infeasibility.
    #[default]
    Backtracking,
    /// Simulated annealing with restarts.
    Annealing,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Backtracking => "backtracking",
            Backend::Annealing => "annealing",
        })
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backtracking" => Ok(Backend::Backtracking),
            "annealing" => Ok(Backend::Annealing),
            other => Err(ConfigError::Invalid(format!("unknown backend `{other}`"))),
        }
    }
}

/// `[solver]`
///
/// Everything after `node_limit` tunes the annealing backend; omitted
/// values keep [`AnnealingSolver`]'s defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverSettings {
    pub backend: Backend,
    pub time_limit_seconds: Option<u64>,
    pub node_limit: Option<u64>,
    pub seed: Option<u64>,
    pub restarts: Option<usize>,
    pub initial_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    /// Geometric factor applied after every temperature level.
    pub cooling_rate: Option<f64>,
    pub iterations_per_temperature: Option<usize>,
    /// Moves per run; 0 = bounded by the temperatures only.
    pub max_iterations: Option<usize>,
    pub tabu_tenure: Option<usize>,
    /// Conflicted cells priced per move.
    pub sample_size: Option<usize>,
}

impl SolverSettings {
    /// The annealing backend with these settings applied.
    pub fn annealing(&self) -> Result<AnnealingSolver, ConfigError> {
        let mut solver = AnnealingSolver::new();
        let mut run = solver.config().clone();
        if let Some(t) = self.initial_temperature {
            run = run.with_initial_temperature(t);
        }
        if let Some(t) = self.min_temperature {
            run = run.with_min_temperature(t);
        }
        if let Some(rate) = self.cooling_rate {
            run = run.with_cooling_rate(rate);
        }
        if let Some(n) = self.iterations_per_temperature {
            run = run.with_iterations_per_temperature(n);
        }
        if let Some(n) = self.max_iterations {
            run = run.with_max_iterations(n);
        }
        run.validate()
            .map_err(|reason| ConfigError::Invalid(format!("[solver] {reason}")))?;
        solver = solver.with_config(run);

        if let Some(seed) = self.seed {
            solver = solver.with_seed(seed);
        }
        if let Some(restarts) = self.restarts {
            solver = solver.with_restarts(restarts);
        }
        if let Some(tenure) = self.tabu_tenure {
            solver = solver.with_tabu_tenure(tenure);
        }
        if let Some(cells) = self.sample_size {
            solver = solver.with_sample_size(cells);
        }
        Ok(solver)
    }
}

impl RotationConfig {
    /// A configuration with the given dimensions and defaults elsewhere.
    pub fn new(teams: usize, activities: usize, capacity: usize) -> Self {
        Self::from_schedule(ScheduleConfig {
            teams,
            activities: Some(activities),
            capacity,
        })
    }

    pub fn from_schedule(schedule: ScheduleConfig) -> Self {
        Self {
            schedule,
            meetings: MeetingsConfig::default(),
            symmetry: SymmetryBreaking::default(),
            solver: SolverSettings::default(),
            names: Names::default(),
        }
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Validated parameters, meeting policy included. Also checks the
    /// name lists against the counts.
    pub fn params(&self) -> Result<RotationParams, ConfigError> {
        let ScheduleConfig {
            teams,
            activities,
            capacity,
        } = self.schedule;
        let params = match activities {
            Some(activities) => RotationParams::new(teams, activities, capacity)?,
            None => RotationParams::from_teams(teams, capacity)?,
        }
        .with_meeting_policy(self.meetings.policy())?;
        self.names.validate(&params)?;
        Ok(params)
    }

    /// Solve limits from `[solver]`.
    pub fn limits(&self) -> SolveLimits {
        let mut limits = SolveLimits::default();
        if let Some(secs) = self.solver.time_limit_seconds {
            limits = limits.with_time_limit(Duration::from_secs(secs));
        }
        if let Some(nodes) = self.solver.node_limit {
            limits = limits.with_node_limit(nodes);
        }
        limits
    }

    /// The configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the annealing settings are out of
    /// range, e.g. `min_temperature` not below `initial_temperature`.
    pub fn solver(&self) -> Result<Box<dyn CpSolver>, ConfigError> {
        Ok(match self.solver.backend {
            Backend::Backtracking => Box::new(BacktrackingSolver::new()),
            Backend::Annealing => Box::new(self.solver.annealing()?),
        })
    }
}
