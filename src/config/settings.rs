//! CLI arguments and shared configuration helpers
//!
//! Defines the `opskit` command line, the output format switch shared by
//! the reporting tools, and loaders for JSON/YAML config files.

use crate::error::{IoResultExt, OpsError, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// OpsKit - developer productivity and DevOps toolkit
#[derive(Parser, Debug, Clone)]
#[command(name = "opskit")]
#[command(author = "OpsKit Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Developer productivity and DevOps toolkit")]
#[command(long_about = r#"
OpsKit bundles small operational tools behind one binary.

Tools:
  logwatch   Follow the first .log file in logs/ and summarize errors
  stats      Print a server resource report
  quality    Check code quality of a Python project
  setup      Automate a Python development environment
  profile    Profile a Python script with cProfile
  pipeline   Create, start and poll cloud CI/CD pipelines

Examples:
  opskit logwatch                          # Watch logs/*.log
  opskit stats --top 10                    # Server report, top 10 processes
  opskit quality . --format json           # Quality report as JSON
  opskit setup --config setup-config.json  # Environment from config
  opskit profile app.py -f main -l 30      # Profile one function
  opskit pipeline -c pipeline.yml create   # Create a cloud pipeline
"#)]
pub struct CliArgs {
    /// Verbose logging (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Tool to run
    #[command(subcommand)]
    pub command: Commands,
}

impl CliArgs {
    /// Default tracing filter directive for the requested verbosity
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch a log file and summarize errors, failures and warnings
    #[command(name = "logwatch")]
    LogWatch(LogWatchArgs),

    /// Print a server statistics report
    #[command(name = "stats")]
    Stats(StatsArgs),

    /// Analyze code quality of a Python project
    #[command(name = "quality")]
    Quality(QualityArgs),

    /// Set up a Python development environment
    #[command(name = "setup")]
    Setup(SetupArgs),

    /// Profile a Python script or one of its functions
    #[command(name = "profile")]
    Profile(ProfileArgs),

    /// Manage cloud CI/CD pipelines
    #[command(name = "pipeline")]
    Pipeline(PipelineArgs),
}

/// Arguments for `opskit logwatch`
#[derive(Args, Debug, Clone)]
pub struct LogWatchArgs {
    /// Directory scanned for *.log files
    #[arg(long, default_value = "logs", value_name = "DIR")]
    pub logs_dir: PathBuf,

    /// Watch this file instead of the first one found in the logs directory
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Number of trailing lines printed on each change
    #[arg(short = 'n', long, default_value = "10", value_name = "NUM")]
    pub lines: usize,

    /// Poll interval in seconds
    #[arg(short, long, default_value = "2", value_name = "SECS")]
    pub interval: u64,

    /// Print one snapshot and exit
    #[arg(long)]
    pub once: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for `opskit stats`
#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Number of processes listed by CPU and by memory
    #[arg(long, default_value = "5", value_name = "NUM")]
    pub top: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for `opskit quality`
#[derive(Args, Debug, Clone)]
pub struct QualityArgs {
    /// Path to the Python project to analyze
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Maximum line length
    #[arg(long, value_name = "NUM")]
    pub max_line_length: Option<usize>,

    /// Maximum function complexity
    #[arg(long, value_name = "NUM")]
    pub max_function_complexity: Option<u32>,

    /// Path to configuration JSON file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also run flake8 when it is installed
    #[arg(long)]
    pub external: bool,
}

/// Arguments for `opskit setup`
#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    /// Path to configuration JSON file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Create a configuration template file and exit
    #[arg(long)]
    pub create_template: bool,

    /// Project name
    #[arg(long)]
    pub project_name: Option<String>,

    /// Required Python version
    #[arg(long)]
    pub python_version: Option<String>,

    /// Virtual environment name
    #[arg(long)]
    pub virtual_env_name: Option<String>,

    /// Requirements file path
    #[arg(long)]
    pub requirements_file: Option<String>,

    /// Additional tools to install
    #[arg(long, num_args = 1..)]
    pub tools: Option<Vec<String>>,

    /// Project directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Python interpreter used to create the environment
    #[arg(long, env = "OPSKIT_PYTHON", value_name = "PATH")]
    pub python: Option<PathBuf>,

    /// Recreate an existing virtual environment without asking
    #[arg(long, conflicts_with = "keep")]
    pub yes: bool,

    /// Reuse an existing virtual environment without asking
    #[arg(long)]
    pub keep: bool,
}

/// Arguments for `opskit profile`
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Python file to profile
    #[arg(value_name = "TARGET_FILE")]
    pub target_file: PathBuf,

    /// Output file for the results
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Specific function to profile
    #[arg(short, long, value_name = "NAME")]
    pub function: Option<String>,

    /// Limit number of statistics lines in the output
    #[arg(short, long, default_value = "20", value_name = "NUM")]
    pub limit: usize,

    /// Python interpreter
    #[arg(long, env = "OPSKIT_PYTHON", value_name = "PATH")]
    pub python: Option<PathBuf>,
}

/// Arguments for `opskit pipeline`
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Path to pipeline configuration file (YAML or JSON)
    #[arg(short, long, value_name = "PATH")]
    pub config: PathBuf,

    /// Timeout in seconds for wait operations (defaults to the config value)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Seconds between status polls while waiting
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub poll_interval: u64,

    /// Pipeline operation
    #[command(subcommand)]
    pub action: PipelineAction,
}

/// Pipeline operations
#[derive(Subcommand, Debug, Clone)]
pub enum PipelineAction {
    /// Create a new pipeline
    Create,
    /// Start a pipeline execution
    Start {
        /// Pipeline id (defaults to the configured pipeline name)
        pipeline_id: Option<String>,
        /// Wait for pipeline completion
        #[arg(long)]
        wait: bool,
    },
    /// Get pipeline status by id
    Status {
        /// Pipeline or run id
        pipeline_id: String,
    },
    /// Deploy a service using a deployment configuration file
    Deploy {
        /// Deployment configuration file (YAML or JSON)
        deployment: PathBuf,
    },
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Load a JSON config file into `T`
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_path(path)?;
    serde_json::from_str(&content)
        .map_err(|e| OpsError::config(format!("{}: {}", path.display(), e)))
}

/// Load a YAML or JSON config file into `T`, chosen by extension
pub fn load_yaml_or_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_path(path)?;
    let result = if is_yaml_path(path) {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };
    result.map_err(|e| OpsError::config(format!("{}: {}", path.display(), e)))
}

/// `.yml` and `.yaml` files are parsed as YAML, everything else as JSON
pub fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}
