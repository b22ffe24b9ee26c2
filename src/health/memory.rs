//! Process memory sampling.

use std::sync::Mutex;

use sysinfo::{Pid, System};

/// Source of the memory figure recorded on each monitoring tick.
pub trait MemorySampler: Send + Sync + std::fmt::Debug {
    /// Current memory usage in megabytes, `None` if it cannot be read.
    fn sample_mb(&self) -> Option<f64>;
}

/// Resident memory of the current process, read through sysinfo.
#[derive(Debug)]
pub struct ProcessMemorySampler {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessMemorySampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot determine current pid, memory sampling disabled");
                None
            }
        };

        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for ProcessMemorySampler {
    fn sample_mb(&self) -> Option<f64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_process(pid);
        system
            .process(pid)
            .map(|process| process.memory() as f64 / 1024.0 / 1024.0)
    }
}

/// Sampler returning a constant, for tests and environments without /proc.
#[derive(Debug, Clone, Copy)]
pub struct FixedMemorySampler(pub f64);

impl MemorySampler for FixedMemorySampler {
    fn sample_mb(&self) -> Option<f64> {
        Some(self.0)
    }
}
