// Supervisor - keeps every process of an ecosystem running

pub mod constants;
mod shutdown;
mod slot;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use slot::SlotCommand;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};

use crate::application::restart::RestartPolicy;
use crate::domain::{Ecosystem, ProcessRecord, ProcessState};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, ProcessLauncher, TimeProvider};
use constants::COMMAND_CHANNEL_CAPACITY;
use slot::Slot;

/// Process table shared by slots and handles
pub type ProcessTable = Arc<RwLock<BTreeMap<String, ProcessRecord>>>;

/// Aggregate counters over the process table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorStats {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub errored: usize,
    pub restarts: u32,
    pub uptime_seconds: i64,
}

/// Supervisor runs one slot task per launch configuration
pub struct Supervisor {
    slots: Vec<Slot>,
    handle: SupervisorHandle,
}

impl Supervisor {
    /// Create a supervisor for `ecosystem`
    ///
    /// # Errors
    /// - AppError::Domain if two configurations share a name
    pub fn new(
        ecosystem: Ecosystem,
        launcher: Arc<dyn ProcessLauncher>,
        policy: Arc<RestartPolicy>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Result<Self> {
        ecosystem.ensure_unique_names()?;

        let table: ProcessTable = Arc::new(RwLock::new(
            ecosystem
                .apps
                .iter()
                .map(|app| (app.name.clone(), ProcessRecord::new(app.name.clone())))
                .collect(),
        ));

        let mut commands = HashMap::with_capacity(ecosystem.len());
        let mut slots = Vec::with_capacity(ecosystem.len());
        for config in ecosystem.apps {
            let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
            commands.insert(config.name.clone(), tx);
            slots.push(Slot {
                config,
                launcher: Arc::clone(&launcher),
                policy: Arc::clone(&policy),
                time: Arc::clone(&time_provider),
                ids: Arc::clone(&id_provider),
                table: Arc::clone(&table),
                commands: rx,
                consecutive: 0,
            });
        }

        let handle = SupervisorHandle {
            table,
            commands: Arc::new(commands),
            started_at: time_provider.now_millis(),
            time: time_provider,
        };

        Ok(Self { slots, handle })
    }

    pub fn handle(&self) -> SupervisorHandle {
        self.handle.clone()
    }

    /// Run all slots until shutdown
    ///
    /// Each slot runs in its own task so a panicking slot cannot take the
    /// others down.
    pub async fn run(self, shutdown: ShutdownToken) -> Result<()> {
        info!(processes = %self.slots.len(), "Supervisor started");

        let tasks: Vec<_> = self
            .slots
            .into_iter()
            .map(|slot| tokio::spawn(slot.run(shutdown.clone())))
            .collect();

        for result in futures::future::join_all(tasks).await {
            if let Err(join_err) = result {
                if join_err.is_panic() {
                    error!("Slot panicked: {:?}", join_err);
                } else {
                    error!("Slot cancelled: {:?}", join_err);
                }
            }
        }

        info!("Supervisor stopped");
        Ok(())
    }
}

/// Cloneable view of a running supervisor
#[derive(Clone)]
pub struct SupervisorHandle {
    table: ProcessTable,
    commands: Arc<HashMap<String, mpsc::Sender<SlotCommand>>>,
    time: Arc<dyn TimeProvider>,
    started_at: i64,
}

impl SupervisorHandle {
    /// Snapshot of every process, ordered by name
    pub async fn list(&self) -> Vec<ProcessRecord> {
        self.table.read().await.values().cloned().collect()
    }

    pub async fn get(&self, name: &str) -> Result<ProcessRecord> {
        self.table
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("process '{}'", name)))
    }

    /// Start a process; false when it is already active
    pub async fn start(&self, name: &str) -> Result<bool> {
        if self.get(name).await?.state.is_active() {
            return Ok(false);
        }
        self.send(name, SlotCommand::Start).await?;
        Ok(true)
    }

    /// Stop a process; false when it is not active
    pub async fn stop(&self, name: &str) -> Result<bool> {
        if !self.get(name).await?.state.is_active() {
            return Ok(false);
        }
        self.send(name, SlotCommand::Stop).await?;
        Ok(true)
    }

    /// Restart a process, starting it when it is down
    pub async fn restart(&self, name: &str) -> Result<bool> {
        self.send(name, SlotCommand::Restart).await?;
        Ok(true)
    }

    async fn send(&self, name: &str, command: SlotCommand) -> Result<()> {
        let tx = self
            .commands
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("process '{}'", name)))?;
        tx.send(command)
            .await
            .map_err(|_| AppError::InvalidState(format!("process '{}' is no longer supervised", name)))?;
        info!(name = %name, command = ?command, "Command queued");
        Ok(())
    }

    pub async fn stats(&self) -> SupervisorStats {
        let table = self.table.read().await;
        let count = |f: fn(&ProcessState) -> bool| table.values().filter(|r| f(&r.state)).count();
        SupervisorStats {
            total: table.len(),
            running: count(|s| *s == ProcessState::Running),
            stopped: count(|s| matches!(s, ProcessState::Stopped | ProcessState::Exited)),
            errored: count(|s| *s == ProcessState::Errored),
            restarts: table.values().map(|r| r.restarts).sum(),
            uptime_seconds: (self.time.now_millis() - self.started_at) / 1000,
        }
    }
}
