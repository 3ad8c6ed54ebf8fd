// src/reconcile/mod.rs

//! Statement reconciliation.
//!
//! One [`Reconciler`] run monitors one submitted statement: it polls the
//! remote service on a fixed interval, diffs jobs, stages, tasks and
//! executors against what it has already seen, and publishes lifecycle
//! events as if the remote side had pushed them.
//!
//! - [`records`] converts raw snapshots into tracked records and event
//!   payloads.
//! - [`detail`] tracks stages and tasks of one job.
//! - [`executors`] diffs executor membership and keeps the core total.
//! - [`result`] interprets the finished statement's output.
//! - [`reconciler`] is the async poll loop tying them together.

use std::time::Duration;

use crate::config::MonitorConfig;
use crate::types::{JobId, SessionId, StatementId, StatementState};

/// Identity of the statement being monitored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementContext {
    pub session_id: SessionId,
    pub statement_id: StatementId,
    /// Spark job group the statement's jobs are tagged with.
    pub job_group: String,
    /// Correlation id stamped on every published event.
    pub cell_guid: String,
}

impl StatementContext {
    /// The job group defaults to the statement id.
    pub fn new(
        session_id: SessionId,
        statement_id: StatementId,
        cell_guid: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            statement_id,
            job_group: statement_id.to_string(),
            cell_guid: cell_guid.into(),
        }
    }

    pub fn with_job_group(mut self, job_group: impl Into<String>) -> Self {
        self.job_group = job_group.into();
        self
    }
}

/// The session's Spark application, once it is known.
///
/// Lives with the session; each reconciler run borrows it so that
/// `sparkApplicationStart` is published once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationState {
    app_id: Option<String>,
    start_time: Option<i64>,
    ended: bool,
}

impl ApplicationState {
    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    pub fn is_started(&self) -> bool {
        self.app_id.is_some()
    }

    pub(crate) fn record_start(&mut self, app_id: String, start_time: i64) {
        self.app_id = Some(app_id);
        self.start_time = Some(start_time);
    }

    /// Mark the application ended. Returns the app id the first time only,
    /// and only if the application was ever started.
    pub(crate) fn take_for_end(&mut self) -> Option<String> {
        if self.ended {
            return None;
        }
        let app_id = self.app_id.clone()?;
        self.ended = true;
        Some(app_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub poll_interval: Duration,
    /// Consecutive transport failures tolerated before giving up.
    pub max_consecutive_failures: u32,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for ReconcileOptions {
    fn from(cfg: &MonitorConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            max_consecutive_failures: cfg.max_consecutive_failures(),
        }
    }
}

/// What a single poll cycle did.
///
/// Returned by [`Reconciler::poll_once`] so tests can step the loop by
/// hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub statement_state: StatementState,
    /// Events published during this cycle.
    pub published: usize,
    /// Job whose stages were inspected this cycle.
    pub drill_down: Option<JobId>,
    /// Statement terminal and no job left to track.
    pub finished: bool,
}

pub mod detail;
pub mod executors;
pub mod reconciler;
pub mod records;
pub mod result;

pub use executors::{ExecutorDiff, ExecutorDiffer};
pub use reconciler::Reconciler;
pub use result::{OutputSink, StatementResult};
