// src/keeper/watchdog.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::RemoteExecutionClient;
use crate::errors::{MonitorError, Result};
use crate::types::{SessionId, SessionStatus};

use super::shared::SessionShared;

/// Snapshot broadcast after every watchdog tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperTelemetry {
    pub session_id: SessionId,
    pub guid: String,
    pub status: SessionStatus,
    pub idle_seconds: u64,
    pub remaining_seconds: u64,
    pub timed_out: bool,
}

/// Why the watchdog loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeeperExit {
    /// Stopped through its handle.
    Stopped,
    /// The remote side reported a terminal session status.
    SessionTerminal(SessionStatus),
    /// The idle timeout fired and the session was forced to `Timeout`.
    TimedOut,
}

pub struct IdleWatchdog<C: ?Sized> {
    client: Arc<C>,
    session_id: SessionId,
    guid: String,
    shared: Arc<SessionShared>,
    interval: Duration,
    timeout: Duration,
    telemetry: watch::Sender<KeeperTelemetry>,
    cancel: CancellationToken,
}

impl<C> IdleWatchdog<C>
where
    C: RemoteExecutionClient + ?Sized + 'static,
{
    pub fn new(
        client: Arc<C>,
        session_id: SessionId,
        guid: impl Into<String>,
        shared: Arc<SessionShared>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        let guid = guid.into();
        let initial = KeeperTelemetry {
            session_id,
            guid: guid.clone(),
            status: shared.status(),
            idle_seconds: 0,
            remaining_seconds: timeout.as_secs(),
            timed_out: shared.is_timed_out(),
        };
        let (telemetry, _) = watch::channel(initial);

        Self {
            client,
            session_id,
            guid,
            shared,
            interval,
            timeout,
            telemetry,
            cancel: CancellationToken::new(),
        }
    }

    /// Start the loop on the tokio runtime.
    pub fn spawn(self) -> KeeperHandle {
        let cancel = self.cancel.clone();
        let telemetry = self.telemetry.subscribe();
        let task = tokio::spawn(self.run());
        KeeperHandle {
            cancel,
            task: Some(task),
            telemetry,
        }
    }

    async fn run(self) -> Result<KeeperExit> {
        info!(
            session_id = self.session_id,
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.timeout.as_secs(),
            "idle watchdog started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_busy = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let polled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                polled = self.client.get_session(self.session_id) => polled,
            };

            let status = match polled.and_then(|snapshot| snapshot.status()) {
                Ok(status) => status,
                Err(err) if err.is_transient() => {
                    warn!(session_id = self.session_id, error = %err, "session poll failed");
                    continue;
                }
                Err(err) => {
                    error!(session_id = self.session_id, error = %err, "stopping idle watchdog");
                    return Err(err);
                }
            };

            self.shared.observe_status(status);
            if status.is_terminal() {
                info!(session_id = self.session_id, %status, "session ended; watchdog stopping");
                self.publish(status, Duration::ZERO);
                return Ok(KeeperExit::SessionTerminal(status));
            }

            let now = Instant::now();
            if status == SessionStatus::Busy {
                last_busy = now;
            }
            let idle = now.duration_since(last_busy);
            self.shared.set_idle_seconds(idle.as_secs());

            if idle > self.timeout {
                self.shared.force_timeout();
                warn!(
                    session_id = self.session_id,
                    idle_secs = idle.as_secs(),
                    "session idle timeout reached"
                );
                self.publish(SessionStatus::Timeout, idle);
                return Ok(KeeperExit::TimedOut);
            }

            self.publish(status, idle);
        }

        debug!(session_id = self.session_id, "idle watchdog stopped");
        Ok(KeeperExit::Stopped)
    }

    fn publish(&self, status: SessionStatus, idle: Duration) {
        let telemetry = KeeperTelemetry {
            session_id: self.session_id,
            guid: self.guid.clone(),
            status,
            idle_seconds: idle.as_secs(),
            remaining_seconds: self.timeout.saturating_sub(idle).as_secs(),
            timed_out: self.shared.is_timed_out(),
        };
        debug!(?telemetry, "watchdog tick");
        // No subscribers is fine.
        self.telemetry.send_replace(telemetry);
    }
}

/// Owner's side of a running watchdog. Dropping it stops the loop.
#[derive(Debug)]
pub struct KeeperHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<KeeperExit>>>,
    telemetry: watch::Receiver<KeeperTelemetry>,
}

impl KeeperHandle {
    pub fn telemetry(&self) -> watch::Receiver<KeeperTelemetry> {
        self.telemetry.clone()
    }

    /// Whether the loop has exited (or was already stopped).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the loop and wait for it. Returns `None` when it had already
    /// been stopped through this handle.
    pub async fn stop(&mut self) -> Result<Option<KeeperExit>> {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            return Ok(None);
        };
        match task.await {
            Ok(exit) => exit.map(Some),
            Err(join_err) => Err(MonitorError::Other(anyhow::anyhow!(
                "idle watchdog task failed: {join_err}"
            ))),
        }
    }
}

impl Drop for KeeperHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
