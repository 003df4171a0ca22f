//! Profiling summaries and saved reports

use super::runner::{ProfileMode, ProfileRun};
use crate::error::{IoResultExt, Result};
use std::fmt::Write as _;
use std::path::Path;

/// Lines of the statistics block treated as its header
pub const STATS_HEADER_LINES: usize = 6;

const RULE: &str = "==================================================";

/// Statistics block split into header and data rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsView<'a> {
    pub header: Vec<&'a str>,
    pub rows: Vec<&'a str>,
}

impl<'a> StatsView<'a> {
    /// Trailing blank lines are not data rows
    pub fn new(stats: &'a str) -> Self {
        let mut lines: Vec<&str> = stats.split('\n').collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        let split = lines.len().min(STATS_HEADER_LINES);
        let rows = lines.split_off(split);
        Self { header: lines, rows }
    }

    /// Rows printed under `limit`
    pub fn shown(&self, limit: usize) -> &[&'a str] {
        &self.rows[..self.rows.len().min(limit)]
    }

    /// Rows left out under `limit`
    pub fn remaining(&self, limit: usize) -> usize {
        self.rows.len().saturating_sub(limit)
    }
}

impl ProfileRun {
    pub fn print_summary(&self) {
        println!("Summary");
        println!("{}", RULE);
        println!("Target File: {}", self.target.display());
        if let ProfileMode::Function(name) = &self.mode {
            println!("Function: {}", name);
        }
        println!("Execution Time: {:.3} seconds", self.execution_time.as_secs_f64());
        if self.memory.has_data() {
            println!("Memory Usage: {:.2} MB", self.memory.delta_mb());
            println!("Peak Memory: {:.2} MB", self.memory.peak_mb());
        } else {
            println!("Memory Usage: unavailable");
        }
        println!("{}", RULE);
    }

    /// Header plus at most `limit` rows of the statistics
    pub fn print_detailed(&self, limit: usize) {
        let view = StatsView::new(&self.stats);

        println!("Detailed Statistics");
        println!("{}", RULE);
        for line in &view.header {
            println!("{}", line);
        }
        for line in view.shown(limit) {
            println!("{}", line);
        }
        let remaining = view.remaining(limit);
        if remaining > 0 {
            println!();
            println!("{} more lines", remaining);
        }
        println!("{}", RULE);
    }

    /// Full text report written by `--output`
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Python Profiler Results");
        let _ = writeln!(out, "Target File: {}", self.target.display());
        if let ProfileMode::Function(name) = &self.mode {
            let _ = writeln!(out, "Function: {}", name);
        }
        let _ = writeln!(
            out,
            "Generated: {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(out, "{}\n", RULE);
        let _ = writeln!(
            out,
            "Execution Time: {:.3} seconds",
            self.execution_time.as_secs_f64()
        );
        if self.memory.has_data() {
            let _ = writeln!(out, "Memory Usage: {:.2} MB", self.memory.delta_mb());
            let _ = writeln!(out, "Peak Memory: {:.2} MB", self.memory.peak_mb());
        }
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Detailed Statistics");
        let _ = writeln!(out, "{}", RULE);
        out.push_str(&self.stats);
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render_report()).with_path(path)
    }
}
