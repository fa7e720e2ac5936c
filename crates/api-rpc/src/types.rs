//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results.

use fleet_core::domain::{ProcessRecord, ProcessState};
use fleet_core::port::ProcessMetrics;
use serde::{Deserialize, Serialize};

/// One row of process.list.v1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub name: String,
    pub state: ProcessState,
    pub pid: Option<u32>,
    pub restarts: u32,
    pub uptime_ms: Option<i64>,
    pub started_at: Option<i64>,
    pub exited_at: Option<i64>,
    pub last_exit_code: Option<i32>,
    pub instance_id: Option<String>,
    pub cpu_percent: Option<f32>,
    pub memory_mb: Option<u64>,
}

impl ProcessInfo {
    pub fn from_record(record: ProcessRecord, now_millis: i64, metrics: Option<ProcessMetrics>) -> Self {
        Self {
            uptime_ms: record.uptime_ms(now_millis),
            name: record.name,
            state: record.state,
            pid: record.pid,
            restarts: record.restarts,
            started_at: record.started_at,
            exited_at: record.exited_at,
            last_exit_code: record.last_exit_code,
            instance_id: record.instance_id,
            cpu_percent: metrics.map(|m| m.cpu_percent),
            memory_mb: metrics.map(|m| m.memory_mb),
        }
    }
}

/// process.start.v1 / process.stop.v1 / process.restart.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessActionResponse {
    pub name: String,
    /// False when the process was already in the requested state
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    #[default]
    Out,
    Err,
}

/// logs.tail.v1 - Tail process logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailLogsRequest {
    pub name: String,
    #[serde(default = "default_lines")]
    pub lines: usize,
    #[serde(default)]
    pub stream: LogStream,
}

fn default_lines() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailLogsResponse {
    pub name: String,
    pub log_path: Option<String>,
    pub lines: Vec<String>,
}

/// admin.stats.v1 - Supervisor statistics
pub use fleet_core::application::SupervisorStats as StatsResponse;
