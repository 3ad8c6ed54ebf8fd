// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Configuration as written by users, before validation.
///
/// Every field has a default, so an empty document is valid input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawMonitorConfig {
    /// Delay between reconciler poll cycles.
    pub poll_interval_ms: u64,
    /// Delay between idle-watchdog ticks.
    pub keeper_interval_secs: u64,
    /// Idle time after which the session is forced into `Timeout`.
    pub session_timeout_secs: u64,
    /// Consecutive failed poll cycles tolerated before the transport
    /// error is handed to the caller.
    pub max_consecutive_failures: u32,
    /// Number of log lines requested per session log fetch.
    pub log_batch_size: u32,
}

impl Default for RawMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            keeper_interval_secs: 60,
            session_timeout_secs: 3_600,
            max_consecutive_failures: 5,
            log_batch_size: 100,
        }
    }
}

/// Validated configuration. Only constructed through
/// `TryFrom<RawMonitorConfig>` or [`MonitorConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    poll_interval: Duration,
    keeper_interval: Duration,
    session_timeout: Duration,
    max_consecutive_failures: u32,
    log_batch_size: u32,
}

impl MonitorConfig {
    pub(crate) fn new_unchecked(raw: RawMonitorConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(raw.poll_interval_ms),
            keeper_interval: Duration::from_secs(raw.keeper_interval_secs),
            session_timeout: Duration::from_secs(raw.session_timeout_secs),
            max_consecutive_failures: raw.max_consecutive_failures,
            log_batch_size: raw.log_batch_size,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn keeper_interval(&self) -> Duration {
        self.keeper_interval
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    pub fn max_consecutive_failures(&self) -> u32 {
        self.max_consecutive_failures
    }

    pub fn log_batch_size(&self) -> u32 {
        self.log_batch_size
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new_unchecked(RawMonitorConfig::default())
    }
}
