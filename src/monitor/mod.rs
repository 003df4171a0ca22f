//! Real-time log monitoring
//!
//! Watches a single log file, prints its trailing lines whenever it
//! changes and keeps running counts of error, failure and warning lines.

mod summary;
mod watcher;

pub use summary::*;
pub use watcher::*;
