// Per-process resource sampling port
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Resource usage of one child
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub cpu_percent: f32,
    pub memory_mb: u64,
}

/// Process probe port
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    /// Sample CPU and memory of `pid`
    ///
    /// # Returns
    /// None if the process does not exist (anymore)
    async fn sample(&self, pid: u32) -> Option<ProcessMetrics>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Reports the same metrics for every pid
    pub struct MockProcessProbe {
        metrics: Option<ProcessMetrics>,
    }

    impl MockProcessProbe {
        pub fn new(cpu_percent: f32, memory_mb: u64) -> Self {
            Self {
                metrics: Some(ProcessMetrics {
                    cpu_percent,
                    memory_mb,
                }),
            }
        }

        pub fn empty() -> Self {
            Self { metrics: None }
        }
    }

    #[async_trait]
    impl ProcessProbe for MockProcessProbe {
        async fn sample(&self, _pid: u32) -> Option<ProcessMetrics> {
            self.metrics
        }
    }
}
