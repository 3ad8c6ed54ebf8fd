// src/client/mod.rs

//! Remote execution client abstraction.
//!
//! The reconciler and the keeper talk to a [`RemoteExecutionClient`]
//! instead of an HTTP stack. The production implementation (Livy plus the
//! Spark monitoring API, with its own retry policy) lives outside this
//! crate; tests plug in a scripted fake.
//!
//! All operations are read-only and idempotent. Failures should be
//! reported as [`MonitorError::Transport`](crate::errors::MonitorError::Transport);
//! the core never interprets them beyond "this cycle failed".
//!
//! - [`model`] holds the typed response records.
//! - [`spark_time`] parses Spark date strings.

pub mod model;
pub mod spark_time;

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::{AttemptId, JobId, SessionId, StageId, StatementId};

pub use model::{
    ApplicationInfo, ExecutorSummary, JobSnapshot, RawTaskMetrics, SessionSnapshot, StageAttempt,
    StatementOutput, StatementSnapshot, TaskSnapshot,
};

/// Boxed future returned by every client call.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Read-only queries against the remote compute service.
///
/// Collection endpoints return `Ok(None)` when the remote side has
/// nothing to report yet; callers treat that like an empty list.
pub trait RemoteExecutionClient: Send + Sync {
    fn get_statement(
        &self,
        session: SessionId,
        statement: StatementId,
    ) -> ClientFuture<'_, StatementSnapshot>;

    fn get_session(&self, session: SessionId) -> ClientFuture<'_, SessionSnapshot>;

    fn get_executors<'a>(
        &'a self,
        session: SessionId,
        app_id: &'a str,
    ) -> ClientFuture<'a, Option<Vec<ExecutorSummary>>>;

    fn get_jobs<'a>(
        &'a self,
        session: SessionId,
        app_id: &'a str,
    ) -> ClientFuture<'a, Option<Vec<JobSnapshot>>>;

    fn get_job_by_id<'a>(
        &'a self,
        session: SessionId,
        app_id: &'a str,
        job: JobId,
    ) -> ClientFuture<'a, JobSnapshot>;

    fn get_stages<'a>(
        &'a self,
        session: SessionId,
        app_id: &'a str,
    ) -> ClientFuture<'a, Option<Vec<StageAttempt>>>;

    /// All attempts of one stage, with inline task details.
    fn get_stage_by_id<'a>(
        &'a self,
        session: SessionId,
        app_id: &'a str,
        stage: StageId,
    ) -> ClientFuture<'a, Option<Vec<StageAttempt>>>;

    fn get_stage_attempt_by_id<'a>(
        &'a self,
        session: SessionId,
        app_id: &'a str,
        stage: StageId,
        attempt: AttemptId,
    ) -> ClientFuture<'a, StageAttempt>;

    /// Application metadata. Secondary query: callers fall back to
    /// defaults when it fails.
    fn get_application<'a>(
        &'a self,
        _session: SessionId,
        _app_id: &'a str,
    ) -> ClientFuture<'a, Option<ApplicationInfo>> {
        Box::pin(async { Ok(None) })
    }

    /// Session driver log lines `[from, from + size)`. Secondary query.
    fn get_session_log(
        &self,
        _session: SessionId,
        _from: u32,
        _size: u32,
    ) -> ClientFuture<'_, Vec<String>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}
