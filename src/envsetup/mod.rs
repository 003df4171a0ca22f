//! Python development environment setup
//!
//! Checks the interpreter version, creates a virtual environment, installs
//! requirements and tool bundles, writes `.env` and runs post-setup shell
//! commands. External commands go through [`CommandRunner`] so the step
//! sequence can run against a recording runner.

mod automation;
mod config;
pub(crate) mod runner;
mod version;

pub use automation::*;
pub use config::*;
pub use runner::{find_python, CommandOutput, CommandRunner, SystemRunner};
pub use version::*;
