#![allow(dead_code)]

use std::collections::BTreeMap;

use sparkmon::client::model::{RawTaskMetrics, StatementOutput, TaskSnapshot};
use sparkmon::client::{ExecutorSummary, JobSnapshot, StageAttempt};
use sparkmon::types::{AttemptId, JobId, JobStatus, StageId, StageStatus, TaskId};

/// Builder for `JobSnapshot`.
pub struct JobBuilder {
    job: JobSnapshot,
}

impl JobBuilder {
    /// A running job in job group `group`.
    pub fn new(job_id: JobId, group: &str) -> Self {
        Self {
            job: JobSnapshot {
                job_id,
                name: format!("job {job_id}"),
                job_group: Some(group.to_string()),
                status: JobStatus::Running,
                ..JobSnapshot::default()
            },
        }
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        self
    }

    pub fn stages(mut self, stage_ids: &[StageId]) -> Self {
        self.job.stage_ids = stage_ids.to_vec();
        self
    }

    pub fn submitted(mut self, ms: i64) -> Self {
        self.job.submission_time = Some(ms);
        self
    }

    pub fn completed(mut self, ms: i64) -> Self {
        self.job.completion_time = Some(ms);
        self
    }

    pub fn build(self) -> JobSnapshot {
        self.job
    }
}

/// Builder for `StageAttempt`.
pub struct StageBuilder {
    stage: StageAttempt,
}

impl StageBuilder {
    /// An active first attempt with no tasks.
    pub fn new(stage_id: StageId) -> Self {
        Self {
            stage: StageAttempt {
                stage_id,
                name: format!("stage {stage_id}"),
                status: StageStatus::Active,
                ..StageAttempt::default()
            },
        }
    }

    pub fn attempt(mut self, attempt_id: AttemptId) -> Self {
        self.stage.attempt_id = attempt_id;
        self
    }

    pub fn status(mut self, status: StageStatus) -> Self {
        self.stage.status = status;
        self
    }

    pub fn submitted(mut self, ms: i64) -> Self {
        self.stage.submission_time = Some(ms);
        self
    }

    pub fn completed(mut self, ms: i64) -> Self {
        self.stage.completion_time = Some(ms);
        self
    }

    pub fn task(mut self, task: TaskSnapshot) -> Self {
        self.stage.num_tasks += 1;
        self.stage.tasks.insert(task.task_id, task);
        self
    }

    pub fn build(self) -> StageAttempt {
        self.stage
    }
}

/// A task still running: no timing metrics yet.
pub fn running_task(task_id: TaskId) -> TaskSnapshot {
    TaskSnapshot {
        task_id,
        index: task_id,
        launch_time: Some(1_000 + task_id),
        executor_id: "1".into(),
        host: "worker-1".into(),
        ..TaskSnapshot::default()
    }
}

/// A task that finished successfully after 100ms.
pub fn finished_task(task_id: TaskId) -> TaskSnapshot {
    TaskSnapshot {
        duration: Some(100),
        task_metrics: Some(RawTaskMetrics {
            executor_deserialize_time: 5,
            executor_run_time: 80,
            result_serialization_time: 1,
            ..RawTaskMetrics::default()
        }),
        ..running_task(task_id)
    }
}

pub fn failed_task(task_id: TaskId, message: &str) -> TaskSnapshot {
    TaskSnapshot {
        error_message: Some(message.to_string()),
        ..finished_task(task_id)
    }
}

pub fn executor(id: &str, cores: u32) -> ExecutorSummary {
    ExecutorSummary {
        id: id.to_string(),
        total_cores: cores,
        host_port: format!("worker-{id}:40000"),
    }
}

/// `ok` output with a single mime entry.
pub fn ok_output(mime: &str, payload: &str) -> StatementOutput {
    StatementOutput {
        status: "ok".into(),
        execution_count: Some(1),
        data: BTreeMap::from([(
            mime.to_string(),
            serde_json::Value::String(payload.to_string()),
        )]),
        ..StatementOutput::default()
    }
}

pub fn error_output(evalue: &str, traceback: &[&str]) -> StatementOutput {
    StatementOutput {
        status: "error".into(),
        execution_count: Some(1),
        ename: Some("Error".into()),
        evalue: Some(evalue.to_string()),
        traceback: traceback.iter().map(|l| l.to_string()).collect(),
        ..StatementOutput::default()
    }
}
