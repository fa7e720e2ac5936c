// Process Launcher Port
// Abstraction for starting, stopping and observing supervised children

use crate::domain::LaunchConfig;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

/// How a child terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitOutcome {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Handle to a freshly spawned child
///
/// `exit` resolves once the child is reaped. A dropped sender means the
/// launcher lost track of the child.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub pid: u32,
    pub out_log: Option<String>,
    pub err_log: Option<String>,
    pub exit: oneshot::Receiver<ExitOutcome>,
}

/// Launcher errors
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Kill failed for pid {pid}: {reason}")]
    KillFailed { pid: u32, reason: String },

    #[error("IO error: {0}")]
    Io(String),
}

/// Process Launcher trait
///
/// Implementations:
/// - SubprocessLauncher: tokio child processes with log files
/// - MockLauncher: in-memory children driven by tests
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start the process described by `config`
    ///
    /// # Errors
    /// - LaunchError::SpawnFailed if the program cannot be started
    /// - LaunchError::Io if log files cannot be opened
    async fn spawn(&self, config: &LaunchConfig) -> Result<SpawnedProcess, LaunchError>;

    /// Terminate a child (graceful first, forced after a grace period)
    async fn kill(&self, pid: u32) -> Result<(), LaunchError>;

    /// Check if a process is still alive
    fn is_alive(&self, pid: u32) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Mock launcher behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Children run until killed or exited by the test
        Hold,
        /// Children exit right after spawning with this code
        ExitImmediately(i32),
        /// Spawning always fails with message
        FailSpawn(String),
    }

    #[derive(Default)]
    struct MockState {
        running: HashMap<u32, (String, oneshot::Sender<ExitOutcome>)>,
        spawns: Vec<(String, u32)>,
        kills: Vec<u32>,
    }

    /// Mock Process Launcher for testing
    #[derive(Clone)]
    pub struct MockLauncher {
        behavior: Arc<Mutex<MockBehavior>>,
        state: Arc<Mutex<MockState>>,
        next_pid: Arc<AtomicU32>,
    }

    impl MockLauncher {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                state: Arc::new(Mutex::new(MockState::default())),
                next_pid: Arc::new(AtomicU32::new(1000)),
            }
        }

        pub fn new_hold() -> Self {
            Self::new(MockBehavior::Hold)
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        /// Number of spawns for `name`
        pub fn spawn_count(&self, name: &str) -> usize {
            self.state
                .lock()
                .unwrap()
                .spawns
                .iter()
                .filter(|(n, _)| n == name)
                .count()
        }

        /// Pid of the live child for `name`
        pub fn live_pid(&self, name: &str) -> Option<u32> {
            self.state
                .lock()
                .unwrap()
                .running
                .iter()
                .find(|(_, (n, _))| n == name)
                .map(|(pid, _)| *pid)
        }

        pub fn kills(&self) -> Vec<u32> {
            self.state.lock().unwrap().kills.clone()
        }

        /// Make the live child of `name` exit with `code`
        pub fn exit(&self, name: &str, code: i32) -> bool {
            let mut state = self.state.lock().unwrap();
            let pid = state
                .running
                .iter()
                .find(|(_, (n, _))| n == name)
                .map(|(pid, _)| *pid);
            match pid.and_then(|pid| state.running.remove(&pid)) {
                Some((_, tx)) => tx.send(ExitOutcome::code(code)).is_ok(),
                None => false,
            }
        }
    }

    #[async_trait]
    impl ProcessLauncher for MockLauncher {
        async fn spawn(&self, config: &LaunchConfig) -> Result<SpawnedProcess, LaunchError> {
            let behavior = self.behavior.lock().unwrap().clone();
            if let MockBehavior::FailSpawn(msg) = behavior {
                return Err(LaunchError::SpawnFailed(msg));
            }

            let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = oneshot::channel();
            let mut state = self.state.lock().unwrap();
            state.spawns.push((config.name.clone(), pid));
            match behavior {
                MockBehavior::ExitImmediately(code) => {
                    let _ = tx.send(ExitOutcome::code(code));
                }
                _ => {
                    state.running.insert(pid, (config.name.clone(), tx));
                }
            }

            Ok(SpawnedProcess {
                pid,
                out_log: Some(format!("/tmp/{}-out.log", config.name)),
                err_log: Some(format!("/tmp/{}-err.log", config.name)),
                exit: rx,
            })
        }

        async fn kill(&self, pid: u32) -> Result<(), LaunchError> {
            let mut state = self.state.lock().unwrap();
            state.kills.push(pid);
            if let Some((_, tx)) = state.running.remove(&pid) {
                let _ = tx.send(ExitOutcome::signal(15));
            }
            Ok(())
        }

        fn is_alive(&self, pid: u32) -> bool {
            self.state.lock().unwrap().running.contains_key(&pid)
        }
    }
}
