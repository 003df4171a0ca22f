//! File system helpers
//!
//! Filtered directory scanning shared by the log watcher
//! and the code quality checker.

mod scanner;

pub use scanner::*;
