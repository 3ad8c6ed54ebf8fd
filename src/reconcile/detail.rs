// src/reconcile/detail.rs

//! Stage and task bookkeeping below the job level.
//!
//! One [`StageBook`] lives for a whole reconciler run and is shared by
//! every job of the statement. Spark lists a shared or skipped stage
//! under several jobs, so retirement is recorded per run, not per job:
//! once an attempt or a task has been ended it is never reported again,
//! whichever job mentions it next.
//!
//! Nothing here does IO. Events are appended to an output buffer in the
//! order they must be published.

use std::collections::BTreeMap;

use tracing::trace;

use crate::client::model::{StageAttempt, TaskSnapshot};
use crate::events::EventBody;
use crate::tracker::{EntityTracker, Transition};
use crate::types::{JobId, StageId, StageKey, StageStatus, TaskId};

use super::records::{StageRecord, TaskRecord};

#[derive(Debug, Default)]
pub struct StageBook {
    stages: EntityTracker<StageKey, StageRecord>,
    tasks: EntityTracker<TaskId, TaskRecord>,
}

impl StageBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts of `stage_id` currently being tracked.
    pub fn tracked_attempts(&self, stage_id: StageId) -> Vec<StageKey> {
        self.stages
            .tracked_ids()
            .into_iter()
            .filter(|key| key.stage_id == stage_id)
            .collect()
    }

    pub fn tracked_stage_count(&self) -> usize {
        self.stages.tracking_len()
    }

    pub fn tracked_task_count(&self) -> usize {
        self.tasks.tracking_len()
    }

    /// Whether the attempt has already been ended during this run.
    pub fn is_retired(&self, key: &StageKey) -> bool {
        self.stages.is_completed(key)
    }

    /// Feed a fresh attempt snapshot of a job that is still running.
    ///
    /// Attempts first seen `PENDING` have not been submitted yet and are
    /// left for a later cycle.
    pub fn observe_stage(
        &mut self,
        job_id: JobId,
        mut attempt: StageAttempt,
        now: i64,
        out: &mut Vec<EventBody>,
    ) {
        let key = attempt.key();
        if attempt.status == StageStatus::Pending && !self.stages.is_known(&key) {
            trace!(job_id, stage = %key, "stage not submitted yet");
            return;
        }

        let tasks = std::mem::take(&mut attempt.tasks);
        let record = StageRecord::new(job_id, attempt);
        let transition = self.stages.observe(key, record.clone());
        self.emit_stage(transition, &record, &tasks, now, out);
    }

    /// Close out an attempt of a job that has ended, whatever status the
    /// attempt itself reports.
    pub fn force_stage(
        &mut self,
        job_id: JobId,
        mut attempt: StageAttempt,
        job_succeeded: bool,
        now: i64,
        out: &mut Vec<EventBody>,
    ) {
        let tasks = std::mem::take(&mut attempt.tasks);
        let record = StageRecord::new(job_id, attempt).forced(job_succeeded);
        let transition = self.stages.retire(record.key());
        if transition == Transition::Retired {
            trace!(job_id, stage = %record.key(), "stage already ended");
        }
        self.emit_stage(transition, &record, &tasks, now, out);
    }

    /// Retire every stage still tracked under `job_id`, using its last
    /// known snapshot.
    pub fn drain_job(&mut self, job_id: JobId, job_succeeded: bool, now: i64, out: &mut Vec<EventBody>) {
        for (key, record) in self.stages.drain_tracked_where(|_, r| r.job_id == job_id) {
            let record = record.forced(job_succeeded);
            self.drain_tasks(key, record.succeeded(), now, out);
            out.push(EventBody::StageCompleted(record.completed(now)));
        }
    }

    fn emit_stage(
        &mut self,
        transition: Transition,
        record: &StageRecord,
        tasks: &BTreeMap<TaskId, TaskSnapshot>,
        now: i64,
        out: &mut Vec<EventBody>,
    ) {
        let key = record.key();
        if transition.emits_start() {
            out.push(EventBody::StageSubmitted(record.submitted(now)));
        }

        match transition {
            Transition::Retired => {}
            Transition::Start | Transition::Continue => {
                self.observe_tasks(key, tasks, None, now, out);
            }
            Transition::End | Transition::FastPath => {
                let succeeded = record.succeeded();
                self.observe_tasks(key, tasks, Some(succeeded), now, out);
                self.drain_tasks(key, succeeded, now, out);
                out.push(EventBody::StageCompleted(record.completed(now)));
            }
        }
    }

    /// `force`: when the stage has ended, the outcome running tasks are
    /// closed with.
    fn observe_tasks(
        &mut self,
        key: StageKey,
        tasks: &BTreeMap<TaskId, TaskSnapshot>,
        force: Option<bool>,
        now: i64,
        out: &mut Vec<EventBody>,
    ) {
        for (task_id, snap) in tasks {
            let mut record = TaskRecord::from_snapshot(key, snap);
            if let Some(succeeded) = force {
                record = record.forced(succeeded);
            }

            let transition = self.tasks.observe(*task_id, record.clone());
            if transition.emits_start() {
                out.push(EventBody::TaskStart(record.start(now)));
            }
            if transition.emits_end() {
                out.push(EventBody::TaskEnd(record.end(now)));
            }
        }
    }

    /// End tasks of `key` that vanished from the stage snapshot before it
    /// ended.
    fn drain_tasks(&mut self, key: StageKey, succeeded: bool, now: i64, out: &mut Vec<EventBody>) {
        for (_, record) in self.tasks.drain_tracked_where(|_, r| r.stage == key) {
            out.push(EventBody::TaskEnd(record.forced(succeeded).end(now)));
        }
    }
}
