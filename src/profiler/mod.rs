//! Python script profiler
//!
//! Runs a script (or one function in it) under cProfile in a child
//! interpreter, sampling the child's resident memory while it runs.

mod memory;
mod report;
mod runner;

pub use memory::*;
pub use report::*;
pub use runner::*;
