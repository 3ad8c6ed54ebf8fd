// src/clock.rs

//! Wall-clock source for event timestamps.
//!
//! Idle-time measurement in the keeper uses `tokio::time::Instant`
//! instead; this clock only stamps published events.

use std::fmt::Debug;

pub trait Clock: Send + Sync + Debug {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
