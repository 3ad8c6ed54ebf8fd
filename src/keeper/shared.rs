// src/keeper/shared.rs

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use crate::types::SessionStatus;

/// Session state shared between the watchdog and everyone else.
///
/// The watchdog is the only writer. Readers may see a value one tick
/// stale. Once `Timeout` is installed it is never replaced.
#[derive(Debug)]
pub struct SessionShared {
    status: AtomicU8,
    timed_out: AtomicBool,
    idle_secs: AtomicU64,
}

impl SessionShared {
    pub fn new(initial: SessionStatus) -> Self {
        Self {
            status: AtomicU8::new(initial.to_u8()),
            timed_out: AtomicBool::new(false),
            idle_secs: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn is_timed_out(&self) -> bool {
        self.timed_out.load(Ordering::Acquire)
    }

    pub fn idle_seconds(&self) -> u64 {
        self.idle_secs.load(Ordering::Relaxed)
    }

    /// The submit gate.
    pub fn can_submit(&self) -> bool {
        !self.is_timed_out() && !self.status().is_terminal()
    }

    /// Record a polled status. Ignored once the session has timed out.
    /// Returns whether the status was stored.
    pub(crate) fn observe_status(&self, status: SessionStatus) -> bool {
        let timeout = SessionStatus::Timeout.to_u8();
        self.status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != timeout).then_some(status.to_u8())
            })
            .is_ok()
    }

    pub(crate) fn set_idle_seconds(&self, secs: u64) {
        self.idle_secs.store(secs, Ordering::Relaxed);
    }

    /// Install the sticky `Timeout` status.
    pub(crate) fn force_timeout(&self) {
        self.timed_out.store(true, Ordering::Release);
        self.status
            .store(SessionStatus::Timeout.to_u8(), Ordering::Release);
    }
}
