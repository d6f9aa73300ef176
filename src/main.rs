use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use u_rotation::config::{Backend, RotationConfig, ScheduleConfig};
use u_rotation::render::{render_table, Names};
use u_rotation::rotation::{validate_solution, Outcome, Scheduler, Solution};
use u_rotation::{ConfigError, Result, RotationError};

/// Exit code when no schedule exists, or a checked schedule is invalid.
const EXIT_INFEASIBLE: u8 = 2;
/// Exit code when the solver stopped without an answer.
const EXIT_FAULT: u8 = 3;

/// Team rotation scheduler
#[derive(Parser, Debug)]
#[command(name = "u-rotation")]
#[command(about = "Schedule teams over activity rounds so no two teams meet twice", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve a schedule and write it as JSON
    Solve {
        /// TOML run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        dims: Dimensions,

        /// Solver backend (backtracking or annealing)
        #[arg(long)]
        backend: Option<Backend>,

        /// Time limit in seconds
        #[arg(long)]
        time_limit: Option<u64>,

        /// Seed for the annealing backend
        #[arg(long)]
        seed: Option<u64>,

        /// Annealing runs before giving up
        #[arg(long)]
        restarts: Option<usize>,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also print the timetable to stderr
        #[arg(long)]
        table: bool,
    },

    /// Print a solution file as a timetable
    Render {
        /// Solution JSON
        #[arg(short, long)]
        solution: PathBuf,

        /// TOML run configuration with display names
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a solution file and list every violation
    Check {
        /// Solution JSON
        #[arg(short, long)]
        solution: PathBuf,

        /// TOML run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        dims: Dimensions,
    },
}

/// Schedule dimensions; override the configuration file.
#[derive(Args, Debug)]
struct Dimensions {
    /// Number of teams
    #[arg(long)]
    teams: Option<usize>,

    /// Number of activities, the no-conflict activity included
    #[arg(long)]
    activities: Option<usize>,

    /// Teams per activity and round
    #[arg(long)]
    capacity: Option<usize>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Solve {
            config,
            dims,
            backend,
            time_limit,
            seed,
            restarts,
            output,
            table,
        } => {
            let overrides = SolveOverrides {
                backend,
                time_limit,
                seed,
                restarts,
            };
            solve_cmd(config.as_deref(), &dims, overrides, output.as_deref(), table)
        }
        Command::Render { solution, config } => render_cmd(&solution, config.as_deref()),
        Command::Check {
            solution,
            config,
            dims,
        } => check_cmd(&solution, config.as_deref(), &dims),
    };

    match result {
        Ok(code) => code,
        Err(RotationError::Solver(fault)) => {
            error!(event = "solver_fault", reason = %fault);
            eprintln!("solver could not finish: {fault}");
            ExitCode::from(EXIT_FAULT)
        }
        Err(err) => {
            error!(event = "error", reason = %err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

struct SolveOverrides {
    backend: Option<Backend>,
    time_limit: Option<u64>,
    seed: Option<u64>,
    restarts: Option<usize>,
}

fn solve_cmd(
    config: Option<&Path>,
    dims: &Dimensions,
    overrides: SolveOverrides,
    output: Option<&Path>,
    table: bool,
) -> Result<ExitCode> {
    let mut config = resolve_config(config, dims)?;
    if let Some(backend) = overrides.backend {
        config.solver.backend = backend;
    }
    if let Some(secs) = overrides.time_limit {
        config.solver.time_limit_seconds = Some(secs);
    }
    if let Some(seed) = overrides.seed {
        config.solver.seed = Some(seed);
    }
    if let Some(restarts) = overrides.restarts {
        config.solver.restarts = Some(restarts);
    }

    let params = config.params()?;
    let solver = config.solver()?;
    let outcome = Scheduler::new(params)
        .with_symmetry(config.symmetry)
        .schedule(&*solver, &config.limits())?;

    match outcome {
        Outcome::Scheduled { solution, stats } => {
            let json = solution.to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(path, format!("{json}\n"))?;
                    info!(event = "written", path = %path.display());
                }
                None => println!("{json}"),
            }
            if table {
                eprint!("{}", render_table(&solution, &config.names));
            }
            eprintln!("schedule found ({stats})");
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Infeasible { stats } => {
            eprintln!("no valid schedule exists ({stats})");
            Ok(ExitCode::from(EXIT_INFEASIBLE))
        }
    }
}

fn render_cmd(solution: &Path, config: Option<&Path>) -> Result<ExitCode> {
    let solution = read_solution(solution)?;
    let names = match config {
        Some(path) => RotationConfig::load(path)?.names,
        None => Names::default(),
    };
    print!("{}", render_table(&solution, &names));
    Ok(ExitCode::SUCCESS)
}

fn check_cmd(solution: &Path, config: Option<&Path>, dims: &Dimensions) -> Result<ExitCode> {
    let params = resolve_config(config, dims)?.params()?;
    let solution = read_solution(solution)?;

    match validate_solution(&solution, &params) {
        Ok(()) => {
            println!("ok");
            Ok(ExitCode::SUCCESS)
        }
        Err(errors) => {
            for err in &errors {
                println!("{:?}: {err}", err.kind);
            }
            eprintln!("{} violation(s)", errors.len());
            Ok(ExitCode::from(EXIT_INFEASIBLE))
        }
    }
}

fn read_solution(path: &Path) -> Result<Solution> {
    let contents = std::fs::read_to_string(path)?;
    Ok(Solution::from_json(&contents)?)
}

/// Loads `config` if given, then applies the dimension flags.
fn resolve_config(config: Option<&Path>, dims: &Dimensions) -> Result<RotationConfig> {
    let mut config = match config {
        Some(path) => RotationConfig::load(path)?,
        None => match (dims.teams, dims.capacity) {
            (Some(teams), Some(capacity)) => RotationConfig::from_schedule(ScheduleConfig {
                teams,
                activities: dims.activities,
                capacity,
            }),
            _ => {
                return Err(ConfigError::Invalid(
                    "pass --config or at least --teams and --capacity".into(),
                )
                .into())
            }
        },
    };
    if let Some(teams) = dims.teams {
        config.schedule.teams = teams;
    }
    if let Some(activities) = dims.activities {
        config.schedule.activities = Some(activities);
    }
    if let Some(capacity) = dims.capacity {
        config.schedule.capacity = capacity;
    }
    Ok(config)
}
