// Process probe implementation
// reason: sysinfo for cross-platform per-process metrics
use async_trait::async_trait;
use sysinfo::{Pid, System};
use tokio::sync::Mutex;
use tracing::debug;

use fleet_core::port::{ProcessMetrics, ProcessProbe};

/// Process probe implementation using sysinfo
///
/// CPU usage is relative to the previous sample of the same pid, so the
/// first sample of a process reads 0.
pub struct SysinfoProbe {
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessProbe for SysinfoProbe {
    async fn sample(&self, pid: u32) -> Option<ProcessMetrics> {
        let mut sys = self.system.lock().await;
        let pid = Pid::from_u32(pid);

        if !sys.refresh_process(pid) {
            return None;
        }
        let process = sys.process(pid)?;

        let metrics = ProcessMetrics {
            cpu_percent: process.cpu_usage(),
            memory_mb: process.memory() / 1024 / 1024,
        };

        debug!(
            pid = %pid,
            cpu = %metrics.cpu_percent,
            mem_mb = %metrics.memory_mb,
            "Process metrics collected"
        );

        Some(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sample_own_process() {
        let probe = SysinfoProbe::new();
        let metrics = probe.sample(std::process::id()).await.expect("expected Some");

        assert!(metrics.cpu_percent >= 0.0);
        assert!(metrics.memory_mb > 0);
    }

    #[tokio::test]
    async fn test_sample_missing_process() {
        let probe = SysinfoProbe::new();
        assert!(probe.sample(u32::MAX - 1).await.is_none());
    }
}
