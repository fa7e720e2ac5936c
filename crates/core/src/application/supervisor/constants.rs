// Supervisor constants (no magic values)
use std::time::Duration;

/// Upper bound for a single restart delay (60s)
pub const MAX_RESTART_DELAY_MS: u64 = 60_000;

/// A run at least this long resets the consecutive restart counter (10s)
pub const MIN_UPTIME_MS: i64 = 10_000;

/// SIGTERM -> SIGKILL grace period used by launchers (5s)
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a slot waits for a killed child to be reaped
pub const TERMINATE_WAIT: Duration = Duration::from_secs(7);

/// How long the daemon waits for all slots after shutdown (10s)
pub const SHUTDOWN_WAIT: Duration = Duration::from_secs(10);

/// Pending commands per slot
pub const COMMAND_CHANNEL_CAPACITY: usize = 16;
