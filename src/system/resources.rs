//! Host resource collection
//!
//! Gathers OS, CPU, memory, swap and disk figures for the server stats
//! report.

use serde::{Deserialize, Serialize};
use std::path::Path;
use sysinfo::{Disks, System};

/// Operating system and host identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    /// Pretty OS name (`PRETTY_NAME` from os-release when available)
    pub os: String,
    /// Kernel version
    pub kernel: String,
    /// Hostname
    pub hostname: String,
    /// Seconds since boot
    pub uptime_secs: u64,
    /// 1, 5 and 15 minute load averages
    pub load_average: [f64; 3],
}

/// CPU information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuInfo {
    /// CPU model name
    pub model: String,
    /// Total number of logical CPUs
    pub logical_cores: usize,
    /// Number of physical cores
    pub physical_cores: usize,
    /// Usage across all cores, in percent
    pub usage_percent: f32,
}

/// Memory or swap usage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Total bytes
    pub total: u64,
    /// Used bytes
    pub used: u64,
    /// Free bytes
    pub free: u64,
}

impl MemoryUsage {
    /// Build from total and used byte counts
    pub fn new(total: u64, used: u64) -> Self {
        Self {
            total,
            used,
            free: total.saturating_sub(used),
        }
    }

    /// Used share in percent (0 when total is 0)
    pub fn used_percent(&self) -> f64 {
        percent(self.used, self.total)
    }
}

/// Usage of one mounted filesystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskUsage {
    /// Mount point path
    pub mount_point: String,
    /// Device name
    pub device: String,
    /// Filesystem type
    pub fs_type: String,
    /// Used and free space
    pub space: MemoryUsage,
}

impl HostInfo {
    /// Collect host identity and load
    pub fn collect() -> Self {
        let load = System::load_average();

        HostInfo {
            os: os_pretty_name(),
            kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .ok()
                .or_else(System::host_name)
                .unwrap_or_else(|| "unknown".to_string()),
            uptime_secs: System::uptime(),
            load_average: [load.one, load.five, load.fifteen],
        }
    }
}

impl CpuInfo {
    /// Collect CPU information from a refreshed `System`
    pub fn collect(sys: &System) -> Self {
        let model = sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        CpuInfo {
            model,
            logical_cores: num_cpus::get(),
            physical_cores: num_cpus::get_physical(),
            usage_percent: sys.global_cpu_usage(),
        }
    }
}

/// Collect RAM usage
pub fn memory_usage(sys: &System) -> MemoryUsage {
    MemoryUsage::new(sys.total_memory(), sys.used_memory())
}

/// Collect swap usage
pub fn swap_usage(sys: &System) -> MemoryUsage {
    MemoryUsage::new(sys.total_swap(), sys.used_swap())
}

/// Collect usage for every mounted filesystem with non-zero size
pub fn disk_usage() -> Vec<DiskUsage> {
    let disks = Disks::new_with_refreshed_list();

    let mut usage: Vec<DiskUsage> = disks
        .iter()
        .filter(|d| d.total_space() > 0)
        .map(|d| {
            let total = d.total_space();
            DiskUsage {
                mount_point: d.mount_point().to_string_lossy().to_string(),
                device: d.name().to_string_lossy().to_string(),
                fs_type: d.file_system().to_string_lossy().to_string(),
                space: MemoryUsage::new(total, total.saturating_sub(d.available_space())),
            }
        })
        .collect();

    usage.sort_by(|a, b| a.mount_point.cmp(&b.mount_point));
    usage.dedup_by(|a, b| a.mount_point == b.mount_point);
    usage
}

/// OS name from `/etc/os-release`, falling back to the platform name
pub fn os_pretty_name() -> String {
    std::fs::read_to_string(Path::new("/etc/os-release"))
        .ok()
        .and_then(|content| parse_os_release(&content))
        .or_else(System::long_os_version)
        .unwrap_or_else(|| std::env::consts::OS.to_string())
}

/// Extract `PRETTY_NAME` from os-release content
pub fn parse_os_release(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.strip_prefix("PRETTY_NAME=")
            .map(|v| v.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}

/// `part` as a percentage of `whole`
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
