// Slot - owns one launch configuration and its child

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::constants::TERMINATE_WAIT;
use super::shutdown::ShutdownToken;
use super::ProcessTable;
use crate::application::restart::{RestartDecision, RestartPolicy};
use crate::domain::{LaunchConfig, ProcessRecord};
use crate::port::{ExitOutcome, IdProvider, ProcessLauncher, TimeProvider};

/// Control command for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCommand {
    Start,
    Stop,
    Restart,
}

/// What a slot does next
enum Next {
    Spawn,
    Idle,
    Exit,
}

/// Why a running child stopped being watched
enum RunEvent {
    Exited(ExitOutcome),
    Lost,
    Stop,
    Restart,
    Shutdown,
}

pub(super) struct Slot {
    pub(super) config: LaunchConfig,
    pub(super) launcher: Arc<dyn ProcessLauncher>,
    pub(super) policy: Arc<RestartPolicy>,
    pub(super) time: Arc<dyn TimeProvider>,
    pub(super) ids: Arc<dyn IdProvider>,
    pub(super) table: ProcessTable,
    pub(super) commands: mpsc::Receiver<SlotCommand>,
    /// Short-lived runs in a row
    pub(super) consecutive: u32,
}

impl Slot {
    pub(super) async fn run(mut self, mut shutdown: ShutdownToken) {
        let mut next = Next::Spawn;
        loop {
            if shutdown.is_shutdown() {
                break;
            }
            next = match next {
                Next::Spawn => self.supervise_child(&mut shutdown).await,
                Next::Idle => self.idle(&mut shutdown).await,
                Next::Exit => break,
            };
        }
        // A slot that leaves while its child is gone always ends Stopped
        let now = self.time.now_millis();
        self.update(|r| {
            if r.state.is_active() {
                r.mark_stopped(now);
            }
        })
        .await;
        info!(name = %self.config.name, "Slot stopped");
    }

    /// Wait for a start/restart command
    async fn idle(&mut self, shutdown: &mut ShutdownToken) -> Next {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SlotCommand::Start) => {
                        self.consecutive = 0;
                        return Next::Spawn;
                    }
                    Some(SlotCommand::Restart) => {
                        self.consecutive = 0;
                        self.update(|r| r.restarts += 1).await;
                        return Next::Spawn;
                    }
                    Some(SlotCommand::Stop) => continue,
                    None => return Next::Exit,
                },
                _ = shutdown.wait() => return Next::Exit,
            }
        }
    }

    /// Spawn the child, watch it and decide what follows its end
    async fn supervise_child(&mut self, shutdown: &mut ShutdownToken) -> Next {
        let (pid, mut exit) = match self.spawn_child().await {
            Some(child) => child,
            None => return Next::Idle,
        };

        let event = loop {
            tokio::select! {
                outcome = &mut exit => break match outcome {
                    Ok(outcome) => RunEvent::Exited(outcome),
                    Err(_) => RunEvent::Lost,
                },
                cmd = self.commands.recv() => match cmd {
                    Some(SlotCommand::Start) => continue,
                    Some(SlotCommand::Stop) => break RunEvent::Stop,
                    Some(SlotCommand::Restart) => break RunEvent::Restart,
                    None => break RunEvent::Shutdown,
                },
                _ = shutdown.wait() => break RunEvent::Shutdown,
            }
        };

        match event {
            RunEvent::Exited(outcome) => self.on_exit(outcome, shutdown).await,
            RunEvent::Lost => {
                error!(name = %self.config.name, pid = %pid, "Lost track of child process");
                let now = self.time.now_millis();
                self.update(|r| r.mark_errored(now)).await;
                Next::Idle
            }
            RunEvent::Stop => {
                info!(name = %self.config.name, pid = %pid, "Stopping process");
                self.terminate(pid, exit).await;
                Next::Idle
            }
            RunEvent::Restart => {
                info!(name = %self.config.name, pid = %pid, "Restarting process on request");
                self.terminate(pid, exit).await;
                self.consecutive = 0;
                self.update(|r| r.restarts += 1).await;
                Next::Spawn
            }
            RunEvent::Shutdown => {
                self.terminate(pid, exit).await;
                Next::Exit
            }
        }
    }

    async fn spawn_child(&mut self) -> Option<(u32, oneshot::Receiver<ExitOutcome>)> {
        self.apply(|r| r.start()).await;

        match self.launcher.spawn(&self.config).await {
            Ok(spawned) => {
                let instance_id = self.ids.generate_id();
                let now = self.time.now_millis();
                let pid = spawned.pid;
                let (out_log, err_log) = (spawned.out_log, spawned.err_log);
                self.apply(|r| {
                    r.out_log = out_log;
                    r.err_log = err_log;
                    r.mark_running(pid, instance_id, now)
                })
                .await;
                info!(name = %self.config.name, pid = %pid, "Process started");
                Some((pid, spawned.exit))
            }
            Err(e) => {
                error!(name = %self.config.name, error = %e, "Failed to spawn process");
                let now = self.time.now_millis();
                self.update(|r| r.mark_errored(now)).await;
                None
            }
        }
    }

    async fn on_exit(&mut self, outcome: ExitOutcome, shutdown: &mut ShutdownToken) -> Next {
        let now = self.time.now_millis();
        let started_at = self
            .update(|r| r.started_at)
            .await
            .unwrap_or(now);
        self.apply(|r| r.mark_exited(outcome.code, now)).await;

        warn!(
            name = %self.config.name,
            exit_code = ?outcome.code,
            signal = ?outcome.signal,
            "Process exited"
        );

        self.consecutive = self.policy.settle(self.consecutive, now - started_at);
        match self.policy.decide(&self.config, self.consecutive, &outcome) {
            RestartDecision::Restart(delay_ms) => {
                self.apply(|r| r.mark_restarting()).await;
                self.consecutive += 1;
                self.restart_delay(delay_ms, shutdown).await
            }
            RestartDecision::GiveUp => {
                if self.config.autorestart && !outcome.success() {
                    self.update(|r| r.mark_errored(now)).await;
                }
                Next::Idle
            }
        }
    }

    /// Sleep before a restart; commands and shutdown cut it short
    async fn restart_delay(&mut self, delay_ms: u64, shutdown: &mut ShutdownToken) -> Next {
        let sleep = tokio::time::sleep(Duration::from_millis(delay_ms));
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Next::Spawn,
                cmd = self.commands.recv() => match cmd {
                    Some(SlotCommand::Start) | Some(SlotCommand::Restart) => return Next::Spawn,
                    Some(SlotCommand::Stop) => {
                        let now = self.time.now_millis();
                        self.update(|r| r.mark_stopped(now)).await;
                        return Next::Idle;
                    }
                    None => return Next::Exit,
                },
                _ = shutdown.wait() => return Next::Exit,
            }
        }
    }

    /// Kill the child and wait for it to be reaped
    async fn terminate(&self, pid: u32, exit: oneshot::Receiver<ExitOutcome>) {
        if let Err(e) = self.launcher.kill(pid).await {
            warn!(name = %self.config.name, pid = %pid, error = %e, "Kill failed");
        }
        match tokio::time::timeout(TERMINATE_WAIT, exit).await {
            Ok(Ok(outcome)) => {
                info!(
                    name = %self.config.name,
                    pid = %pid,
                    exit_code = ?outcome.code,
                    signal = ?outcome.signal,
                    "Process terminated"
                );
            }
            Ok(Err(_)) => {}
            Err(_) => {
                warn!(name = %self.config.name, pid = %pid, "Process did not exit after kill");
            }
        }
        let now = self.time.now_millis();
        self.update(|r| r.mark_stopped(now)).await;
    }

    async fn update<R>(&self, f: impl FnOnce(&mut ProcessRecord) -> R) -> R {
        let mut table = self.table.write().await;
        let record = table
            .entry(self.config.name.clone())
            .or_insert_with(|| ProcessRecord::new(self.config.name.clone()));
        f(record)
    }

    /// Apply a checked transition, logging a rejected one
    async fn apply(&self, f: impl FnOnce(&mut ProcessRecord) -> crate::domain::error::Result<()>) {
        if let Err(e) = self.update(f).await {
            warn!(name = %self.config.name, error = %e, "Rejected state transition");
        }
    }
}
