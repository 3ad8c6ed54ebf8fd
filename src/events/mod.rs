// src/events/mod.rs

//! Lifecycle events published to the downstream consumer.
//!
//! Every event serializes as one flat JSON object with a literal `msgtype`
//! discriminator, the `cellGuid` correlation id of the statement that
//! produced it, and the payload fields of its variant:
//!
//! ```json
//! {"cellGuid":"c-1","msgtype":"sparkTaskStart","taskId":4,"stageId":1,...}
//! ```
//!
//! - [`metrics`] computes the task-end timing breakdown.
//! - [`sink`] defines [`EventSink`] and the bundled sinks.

pub mod metrics;
pub mod sink;

use serde::Serialize;

use crate::types::{
    AttemptId, JobId, JobStatus, StageId, StageStatus, StatementId, TaskId, TaskStatus,
};

pub use metrics::TaskMetrics;
pub use sink::{ChannelSink, EventSink, JsonLinesSink};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparkEvent {
    #[serde(rename = "cellGuid")]
    pub cell_guid: String,
    #[serde(flatten)]
    pub body: EventBody,
}

impl SparkEvent {
    pub fn new(cell_guid: impl Into<String>, body: EventBody) -> Self {
        Self {
            cell_guid: cell_guid.into(),
            body,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "msgtype")]
pub enum EventBody {
    #[serde(rename = "sparkJobReceived")]
    JobReceived(JobReceived),
    #[serde(rename = "sparkApplicationStart")]
    ApplicationStart(ApplicationStart),
    #[serde(rename = "sparkApplicationEnd")]
    ApplicationEnd(ApplicationEnd),
    #[serde(rename = "sparkExecutorAdded")]
    ExecutorAdded(ExecutorAdded),
    #[serde(rename = "sparkExecutorRemoved")]
    ExecutorRemoved(ExecutorRemoved),
    #[serde(rename = "sparkJobStart")]
    JobStart(JobStart),
    #[serde(rename = "sparkJobEnd")]
    JobEnd(JobEnd),
    #[serde(rename = "sparkStageSubmitted")]
    StageSubmitted(StageSubmitted),
    #[serde(rename = "sparkStageCompleted")]
    StageCompleted(StageCompleted),
    #[serde(rename = "sparkTaskStart")]
    TaskStart(TaskStart),
    #[serde(rename = "sparkTaskEnd")]
    TaskEnd(TaskEnd),
}

impl EventBody {
    pub const JOB_RECEIVED: &'static str = "sparkJobReceived";
    pub const APPLICATION_START: &'static str = "sparkApplicationStart";
    pub const APPLICATION_END: &'static str = "sparkApplicationEnd";
    pub const EXECUTOR_ADDED: &'static str = "sparkExecutorAdded";
    pub const EXECUTOR_REMOVED: &'static str = "sparkExecutorRemoved";
    pub const JOB_START: &'static str = "sparkJobStart";
    pub const JOB_END: &'static str = "sparkJobEnd";
    pub const STAGE_SUBMITTED: &'static str = "sparkStageSubmitted";
    pub const STAGE_COMPLETED: &'static str = "sparkStageCompleted";
    pub const TASK_START: &'static str = "sparkTaskStart";
    pub const TASK_END: &'static str = "sparkTaskEnd";

    /// The `msgtype` discriminator of this body.
    pub fn kind(&self) -> &'static str {
        match self {
            EventBody::JobReceived(_) => Self::JOB_RECEIVED,
            EventBody::ApplicationStart(_) => Self::APPLICATION_START,
            EventBody::ApplicationEnd(_) => Self::APPLICATION_END,
            EventBody::ExecutorAdded(_) => Self::EXECUTOR_ADDED,
            EventBody::ExecutorRemoved(_) => Self::EXECUTOR_REMOVED,
            EventBody::JobStart(_) => Self::JOB_START,
            EventBody::JobEnd(_) => Self::JOB_END,
            EventBody::StageSubmitted(_) => Self::STAGE_SUBMITTED,
            EventBody::StageCompleted(_) => Self::STAGE_COMPLETED,
            EventBody::TaskStart(_) => Self::TASK_START,
            EventBody::TaskEnd(_) => Self::TASK_END,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReceived {
    pub statement_id: StatementId,
    pub job_group: String,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStart {
    pub app_id: String,
    pub app_name: String,
    pub app_attempt_id: Option<String>,
    pub spark_user: Option<String>,
    pub start_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationEnd {
    pub app_id: String,
    pub end_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorAdded {
    pub executor_id: String,
    pub host: String,
    pub num_cores: u32,
    /// Running core total after this executor was added.
    pub total_cores: i64,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorRemoved {
    pub executor_id: String,
    /// Running core total after this executor was removed.
    pub total_cores: i64,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStart {
    pub job_id: JobId,
    pub job_group: String,
    pub name: String,
    pub status: JobStatus,
    pub stage_ids: Vec<StageId>,
    pub num_tasks: u32,
    pub submission_time: i64,
    pub app_id: String,
    pub total_cores: i64,
    pub num_executors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEnd {
    pub job_id: JobId,
    pub status: JobStatus,
    pub completion_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSubmitted {
    pub stage_id: StageId,
    pub stage_attempt_id: AttemptId,
    pub job_id: JobId,
    pub name: String,
    pub num_tasks: u32,
    pub parent_ids: Vec<StageId>,
    pub submission_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCompleted {
    pub stage_id: StageId,
    pub stage_attempt_id: AttemptId,
    pub job_id: JobId,
    pub status: StageStatus,
    pub num_tasks: u32,
    pub num_completed_tasks: u32,
    pub num_failed_tasks: u32,
    pub submission_time: i64,
    pub completion_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStart {
    pub task_id: TaskId,
    pub stage_id: StageId,
    pub stage_attempt_id: AttemptId,
    pub index: i64,
    pub attempt_number: i64,
    pub executor_id: String,
    pub host: String,
    pub speculative: bool,
    pub status: TaskStatus,
    pub launch_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEnd {
    pub task_id: TaskId,
    pub stage_id: StageId,
    pub stage_attempt_id: AttemptId,
    pub index: i64,
    pub attempt_number: i64,
    pub executor_id: String,
    pub host: String,
    pub speculative: bool,
    pub status: TaskStatus,
    pub launch_time: i64,
    pub finish_time: i64,
    pub error_message: Option<String>,
    pub metrics: Option<TaskMetrics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat_with_discriminator_and_guid() {
        let event = SparkEvent::new(
            "cell-7",
            EventBody::JobEnd(JobEnd {
                job_id: 3,
                status: JobStatus::Succeeded,
                completion_time: 1_000,
            }),
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["msgtype"], "sparkJobEnd");
        assert_eq!(value["cellGuid"], "cell-7");
        assert_eq!(value["jobId"], 3);
        assert_eq!(value["status"], "SUCCEEDED");
        assert_eq!(value["completionTime"], 1_000);
        assert_eq!(event.kind(), EventBody::JOB_END);
    }

    #[test]
    fn task_status_serializes_uppercase() {
        let body = EventBody::TaskStart(TaskStart {
            task_id: 1,
            stage_id: 2,
            stage_attempt_id: 0,
            index: 0,
            attempt_number: 0,
            executor_id: "1".into(),
            host: "h".into(),
            speculative: false,
            status: TaskStatus::Running,
            launch_time: 5,
        });
        let value = serde_json::to_value(SparkEvent::new("g", body)).unwrap();
        assert_eq!(value["msgtype"], "sparkTaskStart");
        assert_eq!(value["status"], "RUNNING");
        assert_eq!(value["stageAttemptId"], 0);
    }
}
