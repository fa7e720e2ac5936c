// Restart policy for supervised processes
use crate::domain::LaunchConfig;
use crate::port::ExitOutcome;
use tracing::{info, warn};

use super::supervisor::constants::{MAX_RESTART_DELAY_MS, MIN_UPTIME_MS};

/// Restart decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RestartDecision {
    /// Restart the process after a delay in ms
    Restart(u64),
    /// Leave the process down
    GiveUp,
}

/// Restart policy
///
/// Determines if an exited process should be started again based on:
/// - `autorestart` of its launch configuration
/// - Consecutive short-lived runs versus `max_restarts`
/// - `restart_delay_ms` doubled per consecutive restart
pub struct RestartPolicy {
    max_delay_ms: u64,
    min_uptime_ms: i64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::new(MAX_RESTART_DELAY_MS, MIN_UPTIME_MS)
    }
}

impl RestartPolicy {
    /// Create a new restart policy
    ///
    /// # Arguments
    /// * `max_delay_ms` - Upper bound for any single delay
    /// * `min_uptime_ms` - A run at least this long counts as stable
    pub fn new(max_delay_ms: u64, min_uptime_ms: i64) -> Self {
        Self {
            max_delay_ms,
            min_uptime_ms,
        }
    }

    /// Consecutive counter to use after a run of `uptime_ms`
    ///
    /// Stable runs reset the counter.
    pub fn settle(&self, consecutive: u32, uptime_ms: i64) -> u32 {
        if uptime_ms >= self.min_uptime_ms {
            0
        } else {
            consecutive
        }
    }

    /// Decide what to do after an exit
    ///
    /// Delay formula:
    /// delay = restart_delay_ms * 2^consecutive * (1.0 ± 0.1), capped at max_delay_ms
    pub fn decide(
        &self,
        config: &LaunchConfig,
        consecutive: u32,
        outcome: &ExitOutcome,
    ) -> RestartDecision {
        if !config.autorestart {
            info!(
                name = %config.name,
                exit_code = ?outcome.code,
                "autorestart disabled, leaving process down"
            );
            return RestartDecision::GiveUp;
        }

        if consecutive >= config.max_restarts {
            warn!(
                name = %config.name,
                restarts = %consecutive,
                max_restarts = %config.max_restarts,
                "Max restarts reached"
            );
            return RestartDecision::GiveUp;
        }

        let base_delay_ms =
            config.restart_delay_ms as f64 * 2f64.powi(consecutive.min(32) as i32);

        // ±10% jitter, deterministic per process name
        let jitter_seed = config.name.chars().map(|c| c as u32).sum::<u32>();
        let jitter_factor = 0.9 + ((jitter_seed % 21) as f64 / 100.0); // 0.9 to 1.1

        let delay_ms = ((base_delay_ms * jitter_factor) as u64).min(self.max_delay_ms);

        info!(
            name = %config.name,
            restart = %(consecutive + 1),
            max_restarts = %config.max_restarts,
            exit_code = ?outcome.code,
            signal = ?outcome.signal,
            delay_ms = %delay_ms,
            "Scheduling restart"
        );

        RestartDecision::Restart(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_restarts: u32, delay_ms: u64) -> LaunchConfig {
        let mut c = LaunchConfig::new("pdr-trader1", "pdr_backend/trader/main.py");
        c.max_restarts = max_restarts;
        c.restart_delay_ms = delay_ms;
        c
    }

    fn delay(d: RestartDecision) -> u64 {
        match d {
            RestartDecision::Restart(ms) => ms,
            RestartDecision::GiveUp => panic!("expected restart"),
        }
    }

    #[test]
    fn test_exponential_backoff_with_jitter() {
        let policy = RestartPolicy::default();
        let cfg = config(10, 1000);
        let exit = ExitOutcome::code(1);

        let first = delay(policy.decide(&cfg, 0, &exit));
        let second = delay(policy.decide(&cfg, 1, &exit));
        let third = delay(policy.decide(&cfg, 2, &exit));

        assert!((900..=1100).contains(&first));
        assert!((1800..=2200).contains(&second));
        assert!((3600..=4400).contains(&third));
        // Deterministic per name
        assert_eq!(first, delay(policy.decide(&cfg, 0, &exit)));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RestartPolicy::default();
        let cfg = config(100, 1000);
        let d = delay(policy.decide(&cfg, 40, &ExitOutcome::code(1)));
        assert_eq!(d, MAX_RESTART_DELAY_MS);
    }

    #[test]
    fn test_gives_up_after_max_restarts() {
        let policy = RestartPolicy::default();
        let cfg = config(3, 10);
        assert!(matches!(
            policy.decide(&cfg, 2, &ExitOutcome::code(1)),
            RestartDecision::Restart(_)
        ));
        assert_eq!(
            policy.decide(&cfg, 3, &ExitOutcome::code(1)),
            RestartDecision::GiveUp
        );
        assert_eq!(
            policy.decide(&config(0, 10), 0, &ExitOutcome::code(1)),
            RestartDecision::GiveUp
        );
    }

    #[test]
    fn test_autorestart_disabled() {
        let policy = RestartPolicy::default();
        let mut cfg = config(10, 10);
        cfg.autorestart = false;
        assert_eq!(
            policy.decide(&cfg, 0, &ExitOutcome::signal(9)),
            RestartDecision::GiveUp
        );
    }

    #[test]
    fn test_stable_run_resets_counter() {
        let policy = RestartPolicy::default();
        assert_eq!(policy.settle(5, MIN_UPTIME_MS), 0);
        assert_eq!(policy.settle(5, MIN_UPTIME_MS - 1), 5);
    }
}
