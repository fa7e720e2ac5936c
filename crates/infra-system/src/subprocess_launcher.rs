// Subprocess launcher implementation
// reason: tokio::process for async child management, nix for signals
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{info, warn};

use fleet_core::application::supervisor::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use fleet_core::domain::LaunchConfig;
use fleet_core::port::{ExitOutcome, LaunchError, ProcessLauncher, SpawnedProcess, TimeProvider};

/// Variables inherited from the daemon's own environment by default
pub const DEFAULT_ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "USER", "LANG"];

/// Subprocess launcher
///
/// Children start with a cleared environment: only allowlisted daemon
/// variables are inherited, then the launch configuration's env is applied
/// on top.
pub struct SubprocessLauncher {
    time_provider: Arc<dyn TimeProvider>,
    log_dir: PathBuf,
    env_allowlist: Vec<String>,
}

impl SubprocessLauncher {
    /// Create a new subprocess launcher
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for the kill grace period
    /// * `log_dir` - Directory for `<name>-out.log` / `<name>-err.log`
    /// * `extra_allowlist` - Inherited variables on top of DEFAULT_ENV_ALLOWLIST
    ///
    /// # Example
    /// ```ignore
    /// let launcher = SubprocessLauncher::new(
    ///     Arc::new(SystemTimeProvider),
    ///     "/var/log/fleet",
    ///     vec!["TZ".to_string()],
    /// );
    /// ```
    pub fn new(
        time_provider: Arc<dyn TimeProvider>,
        log_dir: impl Into<PathBuf>,
        extra_allowlist: Vec<String>,
    ) -> Self {
        let mut env_allowlist: Vec<String> =
            DEFAULT_ENV_ALLOWLIST.iter().map(|k| k.to_string()).collect();
        for key in extra_allowlist {
            if !env_allowlist.contains(&key) {
                env_allowlist.push(key);
            }
        }
        Self {
            time_provider,
            log_dir: log_dir.into(),
            env_allowlist,
        }
    }

    /// Log files for a process name
    pub fn log_paths(&self, name: &str) -> (PathBuf, PathBuf) {
        (
            self.log_dir.join(format!("{}-out.log", name)),
            self.log_dir.join(format!("{}-err.log", name)),
        )
    }

    /// Filter environment variables to allowlist only
    fn filter_env(&self, env: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
        env.filter(|(k, _)| self.env_allowlist.contains(k)).collect()
    }

    fn open_log(path: &Path) -> Result<File, LaunchError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LaunchError::Io(format!("{}: {}", path.display(), e)))
    }

    /// Kill process with SIGTERM first, then SIGKILL if needed
    async fn kill_graceful(&self, pid: u32) -> Result<(), LaunchError> {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let target = Pid::from_raw(pid as i32);

            // Step 1: Send SIGTERM for graceful shutdown
            info!(pid = %pid, "Sending SIGTERM for graceful shutdown");
            match kill(target, Signal::SIGTERM) {
                Ok(()) => {}
                Err(Errno::ESRCH) => return Ok(()),
                Err(e) => {
                    return Err(LaunchError::KillFailed {
                        pid,
                        reason: format!("SIGTERM failed: {}", e),
                    })
                }
            }

            // Step 2: Wait for process to exit (check every 100ms)
            let start_time = self.time_provider.now_millis();
            let grace_ms = GRACEFUL_SHUTDOWN_TIMEOUT.as_millis() as i64;
            loop {
                tokio::time::sleep(Duration::from_millis(100)).await;

                if !self.is_alive(pid) {
                    info!(pid = %pid, "Process exited gracefully after SIGTERM");
                    return Ok(());
                }

                // Timeout: force kill with SIGKILL
                if self.time_provider.now_millis() - start_time > grace_ms {
                    warn!(pid = %pid, "Process did not exit after SIGTERM, sending SIGKILL");
                    return match kill(target, Signal::SIGKILL) {
                        Ok(()) | Err(Errno::ESRCH) => Ok(()),
                        Err(e) => Err(LaunchError::KillFailed {
                            pid,
                            reason: format!("SIGKILL failed: {}", e),
                        }),
                    };
                }
            }
        }

        #[cfg(windows)]
        {
            // Windows: taskkill /PID with /F flag (force kill)
            info!(pid = %pid, "Killing process on Windows");
            let output = std::process::Command::new("taskkill")
                .args(["/F", "/PID", &pid.to_string()])
                .output()
                .map_err(|e| LaunchError::KillFailed {
                    pid,
                    reason: e.to_string(),
                })?;

            if !output.status.success() {
                return Err(LaunchError::KillFailed {
                    pid,
                    reason: format!("taskkill failed: {}", String::from_utf8_lossy(&output.stderr)),
                });
            }
            Ok(())
        }
    }
}

fn exit_outcome(status: ExitStatus) -> ExitOutcome {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    ExitOutcome {
        code: status.code(),
        signal,
    }
}

#[async_trait]
impl ProcessLauncher for SubprocessLauncher {
    async fn spawn(&self, config: &LaunchConfig) -> Result<SpawnedProcess, LaunchError> {
        let line = config
            .command_line()
            .map_err(|e| LaunchError::SpawnFailed(e.to_string()))?;

        tokio::fs::create_dir_all(&self.log_dir)
            .await
            .map_err(|e| LaunchError::Io(format!("{}: {}", self.log_dir.display(), e)))?;
        let (out_path, err_path) = self.log_paths(&config.name);
        let out = Self::open_log(&out_path)?;
        let err = Self::open_log(&err_path)?;

        let mut command = Command::new(&line.program);
        command
            .args(&line.args)
            .env_clear()
            .envs(self.filter_env(std::env::vars()))
            .envs(&config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err));
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }

        let mut child = command
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed(format!("{}: {}", line.program, e)))?;
        let pid = child
            .id()
            .ok_or_else(|| LaunchError::SpawnFailed("child exited before reporting a pid".to_string()))?;

        info!(
            name = %config.name,
            pid = %pid,
            command = %line,
            env_keys = %config.env.len(),
            "Spawned process"
        );

        // Reaper: resolves the exit channel once the child is gone
        let (tx, rx) = oneshot::channel();
        let name = config.name.clone();
        tokio::spawn(async move {
            let outcome = match child.wait().await {
                Ok(status) => exit_outcome(status),
                Err(e) => {
                    warn!(name = %name, pid = %pid, error = %e, "Failed to wait for process");
                    ExitOutcome {
                        code: None,
                        signal: None,
                    }
                }
            };
            let _ = tx.send(outcome);
        });

        Ok(SpawnedProcess {
            pid,
            out_log: Some(out_path.display().to_string()),
            err_log: Some(err_path.display().to_string()),
            exit: rx,
        })
    }

    async fn kill(&self, pid: u32) -> Result<(), LaunchError> {
        self.kill_graceful(pid).await
    }

    fn is_alive(&self, pid: u32) -> bool {
        #[cfg(unix)]
        {
            use nix::sys::signal::kill;
            use nix::unistd::Pid;

            // Signal 0 checks if process exists without actually sending a signal
            kill(Pid::from_raw(pid as i32), None).is_ok()
        }

        #[cfg(windows)]
        {
            let output = std::process::Command::new("tasklist")
                .args(["/FI", &format!("PID eq {}", pid), "/NH"])
                .output();

            if let Ok(output) = output {
                let output_str = String::from_utf8_lossy(&output.stdout);
                output_str.contains(&pid.to_string())
            } else {
                false
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use fleet_core::port::time_provider::SystemTimeProvider;

    fn launcher(dir: &Path) -> SubprocessLauncher {
        SubprocessLauncher::new(Arc::new(SystemTimeProvider), dir, vec![])
    }

    #[tokio::test]
    async fn test_spawn_writes_stdout_log() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path());
        let config = LaunchConfig::new("echo-test", "echo hello").with_args(["fleet"]);

        let spawned = launcher.spawn(&config).await.unwrap();
        let outcome = spawned.exit.await.unwrap();
        assert!(outcome.success());

        let out = std::fs::read_to_string(dir.path().join("echo-test-out.log")).unwrap();
        assert_eq!(out.trim(), "hello fleet");
        assert_eq!(
            spawned.out_log.as_deref(),
            Some(dir.path().join("echo-test-out.log").to_str().unwrap())
        );
    }

    #[tokio::test]
    async fn test_child_env_is_config_plus_allowlist() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("print_env.sh");
        std::fs::write(&script, "env\n").unwrap();
        std::env::set_var("FLEET_TEST_PARENT_ONLY", "leak");

        let mut config = LaunchConfig::new("env-test", script.to_str().unwrap())
            .with_env("PAIR_FILTER", "BTC/USDT");
        config.interpreter = Some("sh".to_string());

        let launcher = launcher(dir.path());
        let spawned = launcher.spawn(&config).await.unwrap();
        assert!(spawned.exit.await.unwrap().success());

        let out = std::fs::read_to_string(dir.path().join("env-test-out.log")).unwrap();
        assert!(out.contains("PAIR_FILTER=BTC/USDT"));
        assert!(!out.contains("FLEET_TEST_PARENT_ONLY"));
    }

    #[tokio::test]
    async fn test_kill_terminates_child() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path());
        let config = LaunchConfig::new("sleeper", "sleep 30");

        let spawned = launcher.spawn(&config).await.unwrap();
        assert!(launcher.is_alive(spawned.pid));

        launcher.kill(spawned.pid).await.unwrap();
        let outcome = spawned.exit.await.unwrap();
        assert_eq!(outcome.signal, Some(15));
        assert!(!launcher.is_alive(spawned.pid));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(dir.path());
        let config = LaunchConfig::new("missing", "/nonexistent/fleet-agent");

        let err = tokio_test::assert_err!(launcher.spawn(&config).await);
        assert!(matches!(err, LaunchError::SpawnFailed(_)));
    }

    #[test]
    fn test_allowlist_filtering() {
        let launcher = SubprocessLauncher::new(
            Arc::new(SystemTimeProvider),
            "/tmp",
            vec!["ALLOWED_VAR".to_string(), "PATH".to_string()],
        );

        let env = vec![
            ("ALLOWED_VAR".to_string(), "value1".to_string()),
            ("BLOCKED_VAR".to_string(), "value2".to_string()),
            ("PATH".to_string(), "/bin".to_string()),
        ];
        let filtered = launcher.filter_env(env.into_iter());

        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains_key("ALLOWED_VAR"));
        assert!(!filtered.contains_key("BLOCKED_VAR"));
        assert_eq!(launcher.env_allowlist.iter().filter(|k| *k == "PATH").count(), 1);
    }
}
