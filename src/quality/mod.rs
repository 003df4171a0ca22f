//! Python code quality checker
//!
//! Scans a project for `.py` files and reports syntax problems, long lines,
//! PEP 8 naming violations and cyclomatic complexity, with per-project
//! metrics and a 0-100 quality score.
//!
//! Python source is read with a small tokenizer ([`lexer`]) and an
//! indentation-based block reader ([`structure`]); no Python interpreter is
//! needed unless `flake8` checks are enabled.

mod checker;
mod config;
mod external;
pub mod lexer;
mod models;
mod report;
pub mod structure;

pub use checker::*;
pub use config::*;
pub use external::{parse_flake8_output, run_flake8, run_with_timeout, EXTERNAL_TOOL_TIMEOUT};
pub use models::*;
pub use report::group_by_file;
