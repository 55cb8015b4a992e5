use std::time::Duration;

/// Delay between failed open attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(2000);

/// Wait after a successful open before the link counts as usable. The board
/// resets when the port opens and ignores input while it boots.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(2000);

/// Wait after the first board log line before sending the bootstrap
/// configuration, so the board can finish its boot message burst.
pub const DEFAULT_BOOTSTRAP_DELAY: Duration = Duration::from_millis(200);

/// Records kept per telemetry history.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Timing and buffering knobs for a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub retry_interval: Duration,
    pub settle_delay: Duration,
    pub bootstrap_delay: Duration,
    /// Capacity of each telemetry history; the oldest record is evicted first.
    pub log_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            bootstrap_delay: DEFAULT_BOOTSTRAP_DELAY,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}
