//! Server stats report

use super::processes::{
    logged_in_users, process_stats, task_counts, top_processes, ProcessSort, ProcessStat,
    TaskCounts, UserSession,
};
use super::resources::{disk_usage, memory_usage, swap_usage, CpuInfo, DiskUsage, HostInfo, MemoryUsage};
use crate::error::Result;
use chrono::{DateTime, Local};
use humansize::{format_size, BINARY};
use serde::Serialize;
use std::time::Duration;
use sysinfo::System;

/// Default number of rows in each top-processes table
pub const DEFAULT_TOP_PROCESSES: usize = 5;

/// Full server stats snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    /// When the snapshot was taken
    pub collected_at: DateTime<Local>,
    /// OS and host identity
    pub host: HostInfo,
    /// CPU
    pub cpu: CpuInfo,
    /// RAM
    pub memory: MemoryUsage,
    /// Swap
    pub swap: MemoryUsage,
    /// Mounted filesystems
    pub disks: Vec<DiskUsage>,
    /// Busiest processes by CPU
    pub top_cpu: Vec<ProcessStat>,
    /// Largest processes by resident memory
    pub top_memory: Vec<ProcessStat>,
    /// Logged-in users
    pub users: Vec<UserSession>,
    /// Running/total tasks (Linux)
    pub tasks: Option<TaskCounts>,
}

impl ServerStats {
    /// Sample the machine; blocks for the minimum CPU sampling interval
    pub fn collect(top: usize) -> Self {
        let mut sys = System::new_all();
        // CPU usage is a delta between two refreshes
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_all();

        let processes = process_stats(&sys);
        tracing::debug!("Sampled {} processes", processes.len());

        ServerStats {
            collected_at: Local::now(),
            host: HostInfo::collect(),
            cpu: CpuInfo::collect(&sys),
            memory: memory_usage(&sys),
            swap: swap_usage(&sys),
            disks: disk_usage(),
            top_cpu: top_processes(&processes, ProcessSort::Cpu, top),
            top_memory: top_processes(&processes, ProcessSort::Memory, top),
            users: logged_in_users(),
            tasks: task_counts(),
        }
    }

    /// Print the report as pretty JSON
    pub fn print_json(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }

    /// Print the report to the console
    pub fn print_summary(&self) {
        println!("=== Server Performance Stats ===");
        println!("Collected: {}\n", self.collected_at.format("%Y-%m-%d %H:%M:%S"));

        println!("System:");
        println!("  OS: {}", self.host.os);
        println!("  Kernel: {}", self.host.kernel);
        println!("  Hostname: {}", self.host.hostname);
        println!(
            "  Uptime: {}",
            humantime::format_duration(Duration::from_secs(self.host.uptime_secs))
        );
        let [one, five, fifteen] = self.host.load_average;
        println!("  Load average: {:.2}, {:.2}, {:.2}", one, five, fifteen);
        if let Some(tasks) = self.tasks {
            println!("  Tasks: {} running, {} total", tasks.running, tasks.total);
        }

        println!("\nCPU:");
        println!("  Model: {}", self.cpu.model);
        println!(
            "  Cores: {} logical, {} physical",
            self.cpu.logical_cores, self.cpu.physical_cores
        );
        println!("  Total usage: {:.1}%", self.cpu.usage_percent);

        println!("\nMemory:");
        print_usage("  ", &self.memory);
        if self.swap.total > 0 {
            println!("\nSwap:");
            print_usage("  ", &self.swap);
        }

        if !self.disks.is_empty() {
            println!("\nDisk Usage:");
            for disk in &self.disks {
                println!("  {} ({}, {}):", disk.mount_point, disk.device, disk.fs_type);
                print_usage("    ", &disk.space);
            }
        }

        println!("\nTop {} Processes by CPU:", self.top_cpu.len());
        print_process_table(&self.top_cpu);

        println!("\nTop {} Processes by Memory:", self.top_memory.len());
        print_process_table(&self.top_memory);

        println!("\nLogged-in Users:");
        if self.users.is_empty() {
            println!("  (none)");
        }
        for session in &self.users {
            println!("  {:<12} {:<10} {}", session.user, session.terminal, session.since);
        }
    }
}

fn print_usage(indent: &str, usage: &MemoryUsage) {
    println!(
        "{}Total: {}  Used: {} ({:.1}%)  Free: {}",
        indent,
        format_size(usage.total, BINARY),
        format_size(usage.used, BINARY),
        usage.used_percent(),
        format_size(usage.free, BINARY)
    );
}

fn print_process_table(rows: &[ProcessStat]) {
    println!("  {:>8}  {:<24} {:>7}  {:>10}", "PID", "NAME", "CPU%", "MEM");
    for p in rows {
        println!(
            "  {:>8}  {:<24} {:>6.1}%  {:>10}",
            p.pid,
            truncate_name(&p.name, 24),
            p.cpu_percent,
            format_size(p.memory_bytes, BINARY)
        );
    }
}

fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(width - 1).collect();
        short.push('~');
        short
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("sshd", 24), "sshd");
        assert_eq!(truncate_name("abcdefgh", 5), "abcd~");
    }

    #[test]
    fn test_collect_respects_top_limit() {
        let stats = ServerStats::collect(3);
        assert!(stats.top_cpu.len() <= 3);
        assert!(stats.top_memory.len() <= 3);
        assert!(stats.memory.total > 0);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("host").is_some());
        assert!(json["top_memory"].is_array());
    }
}
