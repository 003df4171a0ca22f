//! Server statistics
//!
//! Collects OS, CPU, memory, disk, process and session figures into a
//! single report.

mod processes;
mod report;
mod resources;

pub use processes::*;
pub use report::*;
pub use resources::*;
