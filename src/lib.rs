//! # OpsKit - Developer Productivity and DevOps Toolkit
//!
//! OpsKit bundles small operational tools behind one library and one
//! binary. Each tool is a sequential program: read arguments and at most
//! one config file, shell out to an OS command or call an API, print a
//! report, exit.
//!
//! ## Tools
//!
//! - **Log watcher** ([`monitor`]): follow one log file by modification
//!   time, print its tail and count error/failed/warning lines
//! - **Server stats** ([`system`]): OS, CPU, memory, disk, process and
//!   session report
//! - **Code quality** ([`quality`]): syntax, line length, PEP 8 naming and
//!   cyclomatic complexity checks for Python projects, with a quality score
//! - **Environment setup** ([`envsetup`]): virtual environment, dependencies,
//!   tool bundles, `.env` and post-setup commands
//! - **Profiler** ([`profiler`]): run a Python script under cProfile while
//!   sampling its memory
//! - **Pipelines** ([`pipeline`]): create, start and poll AWS, Azure and GCP
//!   CI/CD pipelines
//!
//! ## Quick Start
//!
//! ```no_run
//! use opskit::quality::{QualityChecker, QualityConfig};
//!
//! let checker = QualityChecker::new("my_project", QualityConfig::default());
//! let report = checker.run_analysis().unwrap();
//! report.print_summary();
//! std::process::exit(report.exit_code());
//! ```
//!
//! ## Watching a Log File
//!
//! ```no_run
//! use opskit::monitor::{discover_log_file, LogWatcher};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn watch() -> opskit::Result<()> {
//! let path = discover_log_file(Path::new("logs"))?;
//! let mut watcher = LogWatcher::new(path)?;
//! watcher
//!     .run(
//!         Duration::from_secs(2),
//!         async { let _ = tokio::signal::ctrl_c().await; },
//!         |snapshot| snapshot.print_text(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Server Statistics
//!
//! ```no_run
//! use opskit::system::ServerStats;
//!
//! let stats = ServerStats::collect(5);
//! stats.print_summary();
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod envsetup;
pub mod error;
pub mod fs;
pub mod monitor;
pub mod pipeline;
pub mod profiler;
pub mod progress;
pub mod quality;
pub mod system;

// Re-export commonly used types
pub use config::{CliArgs, Commands, OutputFormat};
pub use error::{OpsError, Result};
pub use progress::StepReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use opskit::prelude::*;
    //! ```

    pub use crate::config::{load_json, load_yaml_or_json, OutputFormat};
    pub use crate::envsetup::{EnvironmentSetup, SetupConfig, SetupResult, SystemRunner, VenvPolicy};
    pub use crate::error::{OpsError, Result};
    pub use crate::fs::{ScanConfig, Scanner};
    pub use crate::monitor::{discover_log_file, LogSnapshot, LogSummary, LogWatcher};
    pub use crate::pipeline::{
        DeploymentConfig, PipelineConfig, PipelineHelper, PipelineResult, PipelineStatus,
    };
    pub use crate::profiler::{ProfileRun, Profiler};
    pub use crate::progress::StepReporter;
    pub use crate::quality::{QualityChecker, QualityConfig, QualityReport};
    pub use crate::system::ServerStats;
}
