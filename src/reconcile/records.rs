// src/reconcile/records.rs

//! Tracked entity records and the event payloads built from them.
//!
//! Raw snapshots are converted here, once. Past this point nothing looks
//! at optional wire fields to decide an entity's state.
//!
//! Timestamps missing on the wire fall back to the cycle's clock reading.
//! Within one record, start is always <= end.

use crate::client::model::{JobSnapshot, RawTaskMetrics, StageAttempt, TaskSnapshot};
use crate::events::{
    JobEnd, JobStart, StageCompleted, StageSubmitted, TaskEnd, TaskMetrics, TaskStart,
};
use crate::tracker::Lifecycle;
use crate::types::{JobId, StageKey, StageStatus, TaskId, TaskStatus};

impl Lifecycle for JobSnapshot {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// `(start, end)` for an entity, filling gaps from `now`.
///
/// A reported end time is kept as is; the start is clamped down to it.
fn span(start: Option<i64>, end: Option<i64>, now: i64) -> (i64, i64) {
    let end = end.unwrap_or(now);
    let start = start.unwrap_or(end).min(end);
    (start, end)
}

/// Cluster-wide numbers copied into `sparkJobStart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterShape {
    pub total_cores: i64,
    pub num_executors: usize,
}

pub fn job_start(
    job: &JobSnapshot,
    job_group: &str,
    app_id: &str,
    cluster: ClusterShape,
    now: i64,
) -> JobStart {
    let (submission_time, _) = span(job.submission_time, job.completion_time, now);
    JobStart {
        job_id: job.job_id,
        job_group: job_group.to_string(),
        name: job.name.clone(),
        status: job.status,
        stage_ids: job.stage_ids.clone(),
        num_tasks: job.num_tasks,
        submission_time,
        app_id: app_id.to_string(),
        total_cores: cluster.total_cores,
        num_executors: cluster.num_executors,
    }
}

pub fn job_end(job: &JobSnapshot, now: i64) -> JobEnd {
    let (_, completion_time) = span(job.submission_time, job.completion_time, now);
    JobEnd {
        job_id: job.job_id,
        status: job.status,
        completion_time,
    }
}

/// A stage attempt as tracked under its job. Task details are stripped;
/// tasks have their own tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
    pub job_id: JobId,
    pub attempt: StageAttempt,
}

impl StageRecord {
    pub fn new(job_id: JobId, mut attempt: StageAttempt) -> Self {
        attempt.tasks.clear();
        Self { job_id, attempt }
    }

    pub fn key(&self) -> StageKey {
        self.attempt.key()
    }

    /// Close out a stage whose job already ended.
    pub fn forced(mut self, job_succeeded: bool) -> Self {
        self.attempt.status = self.attempt.status.forced_terminal(job_succeeded);
        self
    }

    pub fn succeeded(&self) -> bool {
        matches!(
            self.attempt.status,
            StageStatus::Complete | StageStatus::Skipped
        )
    }

    pub fn submitted(&self, now: i64) -> StageSubmitted {
        let a = &self.attempt;
        let (submission_time, _) = span(a.submission_time, a.completion_time, now);
        StageSubmitted {
            stage_id: a.stage_id,
            stage_attempt_id: a.attempt_id,
            job_id: self.job_id,
            name: a.name.clone(),
            num_tasks: a.num_tasks,
            parent_ids: a.parent_ids.clone(),
            submission_time,
        }
    }

    pub fn completed(&self, now: i64) -> StageCompleted {
        let a = &self.attempt;
        let (submission_time, completion_time) = span(a.submission_time, a.completion_time, now);
        StageCompleted {
            stage_id: a.stage_id,
            stage_attempt_id: a.attempt_id,
            job_id: self.job_id,
            status: a.status,
            num_tasks: a.num_tasks,
            num_completed_tasks: a.num_complete_tasks,
            num_failed_tasks: a.num_failed_tasks,
            submission_time,
            completion_time,
        }
    }
}

impl Lifecycle for StageRecord {
    fn is_terminal(&self) -> bool {
        self.attempt.status.is_terminal()
    }
}

/// A task with its status already derived.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub stage: StageKey,
    pub index: i64,
    pub attempt_number: i64,
    pub executor_id: String,
    pub host: String,
    pub speculative: bool,
    pub status: TaskStatus,
    pub launch_time: Option<i64>,
    pub duration: Option<i64>,
    pub error_message: Option<String>,
    pub metrics: Option<TaskMetrics>,
}

impl TaskRecord {
    pub fn from_snapshot(stage: StageKey, snap: &TaskSnapshot) -> Self {
        let has_timing = snap
            .task_metrics
            .as_ref()
            .is_some_and(RawTaskMetrics::has_timing);
        let status = TaskStatus::derive(snap.error_message.is_some(), has_timing);

        let metrics = match (&snap.task_metrics, status.is_terminal()) {
            (Some(raw), true) => Some(TaskMetrics::compute(
                raw,
                snap.duration.unwrap_or(0),
                snap.getting_result_time,
                snap.scheduler_delay,
            )),
            _ => None,
        };

        Self {
            task_id: snap.task_id,
            stage,
            index: snap.index,
            attempt_number: snap.attempt,
            executor_id: snap.executor_id.clone(),
            host: snap.host.clone(),
            speculative: snap.speculative,
            status,
            launch_time: snap.launch_time,
            duration: snap.duration,
            error_message: snap.error_message.clone(),
            metrics,
        }
    }

    /// Close out a task whose stage already ended.
    pub fn forced(mut self, stage_succeeded: bool) -> Self {
        if !self.status.is_terminal() {
            self.status = if stage_succeeded {
                TaskStatus::Success
            } else {
                TaskStatus::Failed
            };
        }
        self
    }

    fn times(&self, now: i64) -> (i64, i64) {
        let launch = self.launch_time.unwrap_or(now);
        let finish = match self.duration {
            Some(d) => launch + d.max(0),
            None => now.max(launch),
        };
        (launch, finish)
    }

    pub fn start(&self, now: i64) -> TaskStart {
        let (launch_time, _) = self.times(now);
        TaskStart {
            task_id: self.task_id,
            stage_id: self.stage.stage_id,
            stage_attempt_id: self.stage.attempt_id,
            index: self.index,
            attempt_number: self.attempt_number,
            executor_id: self.executor_id.clone(),
            host: self.host.clone(),
            speculative: self.speculative,
            status: TaskStatus::Running,
            launch_time,
        }
    }

    pub fn end(&self, now: i64) -> TaskEnd {
        let (launch_time, finish_time) = self.times(now);
        TaskEnd {
            task_id: self.task_id,
            stage_id: self.stage.stage_id,
            stage_attempt_id: self.stage.attempt_id,
            index: self.index,
            attempt_number: self.attempt_number,
            executor_id: self.executor_id.clone(),
            host: self.host.clone(),
            speculative: self.speculative,
            status: self.status,
            launch_time,
            finish_time,
            error_message: self.error_message.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl Lifecycle for TaskRecord {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
