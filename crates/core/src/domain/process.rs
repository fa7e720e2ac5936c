// Supervised process record

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};

/// Process state as tracked by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Restarting,
    Exited,
    Errored,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::Stopped => write!(f, "STOPPED"),
            ProcessState::Starting => write!(f, "STARTING"),
            ProcessState::Running => write!(f, "RUNNING"),
            ProcessState::Restarting => write!(f, "RESTARTING"),
            ProcessState::Exited => write!(f, "EXITED"),
            ProcessState::Errored => write!(f, "ERRORED"),
        }
    }
}

impl ProcessState {
    /// True while a child may exist
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ProcessState::Starting | ProcessState::Running | ProcessState::Restarting
        )
    }
}

/// Process table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub name: String,
    pub state: ProcessState,
    pub pid: Option<u32>,
    /// Restarts since the daemon started
    pub restarts: u32,
    pub started_at: Option<i64>, // epoch ms
    pub exited_at: Option<i64>,  // epoch ms
    pub last_exit_code: Option<i32>,
    /// Changes on every spawn
    pub instance_id: Option<String>,
    pub out_log: Option<String>,
    pub err_log: Option<String>,
}

fn transition(from: ProcessState, to: ProcessState) -> DomainError {
    DomainError::InvalidStateTransition {
        from: from.to_string(),
        to: to.to_string(),
    }
}

impl ProcessRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ProcessState::Stopped,
            pid: None,
            restarts: 0,
            started_at: None,
            exited_at: None,
            last_exit_code: None,
            instance_id: None,
            out_log: None,
            err_log: None,
        }
    }

    /// Stopped / Exited / Errored / Restarting -> Starting
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            ProcessState::Stopped
            | ProcessState::Exited
            | ProcessState::Errored
            | ProcessState::Restarting => {
                self.state = ProcessState::Starting;
                Ok(())
            }
            other => Err(transition(other, ProcessState::Starting)),
        }
    }

    /// Starting -> Running, with the spawned child's identity
    pub fn mark_running(
        &mut self,
        pid: u32,
        instance_id: impl Into<String>,
        now_millis: i64,
    ) -> Result<()> {
        if self.state != ProcessState::Starting {
            return Err(transition(self.state, ProcessState::Running));
        }
        self.state = ProcessState::Running;
        self.pid = Some(pid);
        self.instance_id = Some(instance_id.into());
        self.started_at = Some(now_millis);
        self.exited_at = None;
        Ok(())
    }

    /// Running -> Exited
    pub fn mark_exited(&mut self, exit_code: Option<i32>, now_millis: i64) -> Result<()> {
        if self.state != ProcessState::Running {
            return Err(transition(self.state, ProcessState::Exited));
        }
        self.state = ProcessState::Exited;
        self.pid = None;
        self.last_exit_code = exit_code;
        self.exited_at = Some(now_millis);
        Ok(())
    }

    /// Exited -> Restarting
    pub fn mark_restarting(&mut self) -> Result<()> {
        if self.state != ProcessState::Exited {
            return Err(transition(self.state, ProcessState::Restarting));
        }
        self.state = ProcessState::Restarting;
        self.restarts += 1;
        Ok(())
    }

    /// Spawn failed or restarts exhausted
    pub fn mark_errored(&mut self, now_millis: i64) {
        self.state = ProcessState::Errored;
        self.pid = None;
        self.exited_at.get_or_insert(now_millis);
    }

    /// Any state -> Stopped; the child is gone
    pub fn mark_stopped(&mut self, now_millis: i64) {
        if self.pid.is_some() {
            self.exited_at = Some(now_millis);
        }
        self.state = ProcessState::Stopped;
        self.pid = None;
    }

    /// Milliseconds since the current child started
    pub fn uptime_ms(&self, now_millis: i64) -> Option<i64> {
        match (self.state, self.started_at) {
            (ProcessState::Running, Some(started)) => Some((now_millis - started).max(0)),
            _ => None,
        }
    }
}
