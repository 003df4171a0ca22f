//! Resident memory sampling of a running child process

use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Memory figures derived from a series of samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// First sample
    pub before_bytes: u64,
    /// Largest sample
    pub peak_bytes: u64,
    pub samples: usize,
}

impl MemoryStats {
    pub fn from_samples(samples: &[u64]) -> Self {
        Self {
            before_bytes: samples.first().copied().unwrap_or(0),
            peak_bytes: samples.iter().copied().max().unwrap_or(0),
            samples: samples.len(),
        }
    }

    /// Growth from the first sample to the peak
    pub fn delta_bytes(&self) -> u64 {
        self.peak_bytes.saturating_sub(self.before_bytes)
    }

    pub fn delta_mb(&self) -> f64 {
        self.delta_bytes() as f64 / BYTES_PER_MB
    }

    pub fn peak_mb(&self) -> f64 {
        self.peak_bytes as f64 / BYTES_PER_MB
    }

    pub fn has_data(&self) -> bool {
        self.samples > 0
    }
}

/// Polls one process's resident set size
pub struct MemorySampler {
    system: System,
    pid: Pid,
    samples: Vec<u64>,
}

impl MemorySampler {
    pub fn new(pid: u32) -> Self {
        Self {
            system: System::new(),
            pid: Pid::from_u32(pid),
            samples: Vec::new(),
        }
    }

    /// Take one sample; `None` once the process is gone
    pub fn sample(&mut self) -> Option<u64> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            ProcessRefreshKind::new().with_memory(),
        );
        let rss = self.system.process(self.pid)?.memory();
        // A zombie reports 0 after exit
        if rss == 0 {
            return None;
        }
        self.samples.push(rss);
        Some(rss)
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats::from_samples(&self.samples)
    }
}
