//! Progress reporting module
//!
//! Spinners and per-step outcome lines for long-running external commands
//! (environment setup, profiling runs, pipeline waits).

mod reporter;

pub use reporter::*;
