use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub memory_mb: u64,
    pub peak_memory_mb: u64,
    pub cpu_usage: f32,
    pub elapsed: Duration,
}

/// Tracks wall time and process footprint over an export run.
#[cfg(feature = "cli")]
pub struct RunMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    started: Instant,
    peak_memory_mb: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        let system = if enabled {
            System::new_with_specifics(RefreshKind::everything())
        } else {
            System::new()
        };

        Self {
            system: Mutex::new(system),
            pid: sysinfo::get_current_pid().ok(),
            started: Instant::now(),
            peak_memory_mb: Mutex::new(0),
            enabled,
        }
    }

    pub fn sample(&self) -> Option<ProcessStats> {
        if !self.enabled {
            return None;
        }

        let mut system = self.system.lock().ok()?;
        system.refresh_all();
        let process = system.process(self.pid?)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory_mb.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        Some(ProcessStats {
            memory_mb,
            peak_memory_mb: *peak,
            cpu_usage: process.cpu_usage(),
            elapsed: self.started.elapsed(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(not(feature = "cli"))]
pub struct RunMonitor {
    started: Instant,
}

#[cfg(not(feature = "cli"))]
impl RunMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn sample(&self) -> Option<ProcessStats> {
        None
    }

    pub fn is_enabled(&self) -> bool {
        false
    }
}

impl RunMonitor {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn log_checkpoint(&self, label: &str) {
        if let Some(stats) = self.sample() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                label,
                stats.cpu_usage,
                stats.memory_mb,
                stats.peak_memory_mb,
                stats.elapsed
            );
        }
    }

    pub fn log_final(&self) {
        match self.sample() {
            Some(stats) => tracing::info!(
                "📊 Run finished in {:?}, peak memory {}MB",
                stats.elapsed,
                stats.peak_memory_mb
            ),
            None => tracing::debug!("Run finished in {:?}", self.elapsed()),
        }
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
