//! Top process listings, logged-in users and task counts

use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};
use sysinfo::System;

/// One row of a top-processes table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessStat {
    /// Process id
    pub pid: u32,
    /// Executable name
    pub name: String,
    /// CPU usage in percent of one core
    pub cpu_percent: f32,
    /// Resident memory in bytes
    pub memory_bytes: u64,
}

/// Ordering for a top-processes table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSort {
    /// Highest CPU first
    Cpu,
    /// Highest resident memory first
    Memory,
}

/// Snapshot every process known to `sys`
pub fn process_stats(sys: &System) -> Vec<ProcessStat> {
    sys.processes()
        .iter()
        .map(|(pid, process)| ProcessStat {
            pid: pid.as_u32(),
            name: process.name().to_string_lossy().to_string(),
            cpu_percent: process.cpu_usage(),
            memory_bytes: process.memory(),
        })
        .collect()
}

/// The `n` largest processes by the given key; ties break on pid
pub fn top_processes(stats: &[ProcessStat], sort: ProcessSort, n: usize) -> Vec<ProcessStat> {
    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| {
        let primary = match sort {
            ProcessSort::Cpu => b.cpu_percent.total_cmp(&a.cpu_percent),
            ProcessSort::Memory => b.memory_bytes.cmp(&a.memory_bytes),
        };
        primary.then(a.pid.cmp(&b.pid))
    });
    sorted.truncate(n);
    sorted
}

/// A logged-in user session as reported by `who`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSession {
    /// Login name
    pub user: String,
    /// Terminal line
    pub terminal: String,
    /// Login time and origin as printed by `who`
    pub since: String,
}

/// Run `who` and parse its output; an absent or failing command yields
/// an empty list
pub fn logged_in_users() -> Vec<UserSession> {
    if which::which("who").is_err() {
        tracing::debug!("`who` not found, skipping user list");
        return Vec::new();
    }

    match Command::new("who")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
    {
        Ok(output) if output.status.success() => {
            parse_who(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            tracing::debug!(
                "`who` exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            Vec::new()
        }
        Err(e) => {
            tracing::debug!("Cannot run `who`: {}", e);
            Vec::new()
        }
    }
}

/// Parse `who` output lines: `user terminal date time [(origin)]`
pub fn parse_who(output: &str) -> Vec<UserSession> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let user = parts.next()?.to_string();
            let terminal = parts.next()?.to_string();
            let since = parts.collect::<Vec<_>>().join(" ");
            Some(UserSession {
                user,
                terminal,
                since,
            })
        })
        .collect()
}

/// Runnable and total scheduling entities from `/proc/loadavg`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCounts {
    /// Currently runnable tasks
    pub running: u32,
    /// Total tasks
    pub total: u32,
}

/// Read task counts (Linux only)
#[cfg(target_os = "linux")]
pub fn task_counts() -> Option<TaskCounts> {
    use procfs::Current;

    match procfs::LoadAverage::current() {
        Ok(load) => Some(TaskCounts {
            running: load.cur,
            total: load.max,
        }),
        Err(e) => {
            tracing::debug!("Cannot read /proc/loadavg: {}", e);
            None
        }
    }
}

/// Read task counts (Linux only)
#[cfg(not(target_os = "linux"))]
pub fn task_counts() -> Option<TaskCounts> {
    None
}
