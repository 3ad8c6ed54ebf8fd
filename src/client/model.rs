// src/client/model.rs

//! Typed records returned by [`super::RemoteExecutionClient`].
//!
//! Field names follow the Livy and Spark monitoring REST payloads
//! (camelCase). Spark dates (`2024-03-01T10:15:30.123GMT`) are parsed
//! into millisecond epochs at deserialization time.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::Result;
use crate::types::{
    AttemptId, JobId, JobStatus, SessionStatus, StageId, StageKey, StageStatus, StatementId,
    StatementState, TaskId,
};

use super::spark_time;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatementSnapshot {
    pub id: StatementId,
    pub state: String,
    #[serde(default)]
    pub output: Option<StatementOutput>,
}

impl StatementSnapshot {
    pub fn state(&self) -> Result<StatementState> {
        self.state.parse()
    }
}

/// Jupyter-style output payload attached to a finished statement.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatementOutput {
    pub status: String,
    #[serde(default)]
    pub execution_count: Option<i64>,
    /// Mime type -> payload.
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub ename: Option<String>,
    #[serde(default)]
    pub evalue: Option<String>,
    #[serde(default)]
    pub traceback: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: String,
    #[serde(default)]
    pub app_id: Option<String>,
}

impl SessionSnapshot {
    pub fn status(&self) -> Result<SessionStatus> {
        self.state.parse()
    }

    /// Application id, once Livy has reported a non-blank one.
    pub fn known_app_id(&self) -> Option<&str> {
        self.app_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attempts: Vec<ApplicationAttempt>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationAttempt {
    #[serde(default)]
    pub attempt_id: Option<String>,
    #[serde(default, deserialize_with = "spark_time::deserialize")]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub spark_user: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorSummary {
    pub id: String,
    #[serde(default)]
    pub total_cores: u32,
    #[serde(default)]
    pub host_port: String,
}

impl ExecutorSummary {
    /// The driver shows up in the executor list but runs no tasks.
    pub fn is_driver(&self) -> bool {
        self.id == "driver"
    }

    /// Host part of `host:port`.
    pub fn host(&self) -> &str {
        self.host_port
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&self.host_port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: JobId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub job_group: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub stage_ids: Vec<StageId>,
    #[serde(default)]
    pub num_tasks: u32,
    #[serde(default, deserialize_with = "spark_time::deserialize")]
    pub submission_time: Option<i64>,
    #[serde(default, deserialize_with = "spark_time::deserialize")]
    pub completion_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageAttempt {
    pub stage_id: StageId,
    #[serde(default)]
    pub attempt_id: AttemptId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: StageStatus,
    #[serde(default)]
    pub num_tasks: u32,
    #[serde(default)]
    pub num_complete_tasks: u32,
    #[serde(default)]
    pub num_failed_tasks: u32,
    #[serde(default)]
    pub parent_ids: Vec<StageId>,
    #[serde(default, deserialize_with = "spark_time::deserialize")]
    pub submission_time: Option<i64>,
    #[serde(default, deserialize_with = "spark_time::deserialize")]
    pub completion_time: Option<i64>,
    /// Inline task details, keyed by task id.
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, TaskSnapshot>,
}

impl StageAttempt {
    pub fn key(&self) -> StageKey {
        StageKey::new(self.stage_id, self.attempt_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub attempt: i64,
    #[serde(default, deserialize_with = "spark_time::deserialize")]
    pub launch_time: Option<i64>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub executor_id: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub speculative: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub scheduler_delay: Option<i64>,
    #[serde(default)]
    pub getting_result_time: i64,
    #[serde(default)]
    pub task_metrics: Option<RawTaskMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTaskMetrics {
    pub executor_deserialize_time: i64,
    pub executor_run_time: i64,
    pub result_size: i64,
    pub jvm_gc_time: i64,
    pub result_serialization_time: i64,
    pub memory_bytes_spilled: i64,
    pub disk_bytes_spilled: i64,
    pub peak_execution_memory: i64,
    pub shuffle_read_metrics: Option<ShuffleReadMetrics>,
    pub shuffle_write_metrics: Option<ShuffleWriteMetrics>,
}

impl RawTaskMetrics {
    /// Whether any of the timing counters Spark fills on completion is set.
    pub fn has_timing(&self) -> bool {
        self.executor_run_time > 0
            || self.executor_deserialize_time > 0
            || self.result_serialization_time > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShuffleReadMetrics {
    pub fetch_wait_time: i64,
    pub remote_bytes_read: i64,
    pub local_bytes_read: i64,
    pub records_read: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShuffleWriteMetrics {
    /// Nanoseconds.
    pub write_time: i64,
    pub bytes_written: i64,
    pub records_written: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_attempt_parses_inline_tasks_and_dates() {
        let json = r#"{
            "status": "COMPLETE",
            "stageId": 3,
            "attemptId": 0,
            "numTasks": 1,
            "numCompleteTasks": 1,
            "name": "count at <stdin>:1",
            "submissionTime": "2024-03-01T10:15:30.123GMT",
            "completionTime": "2024-03-01T10:15:31.000GMT",
            "tasks": {
                "12": {
                    "taskId": 12,
                    "index": 0,
                    "attempt": 0,
                    "launchTime": "2024-03-01T10:15:30.200GMT",
                    "duration": 700,
                    "executorId": "1",
                    "host": "worker-1",
                    "speculative": false,
                    "taskMetrics": {
                        "executorDeserializeTime": 40,
                        "executorRunTime": 600,
                        "resultSerializationTime": 2,
                        "shuffleWriteMetrics": { "writeTime": 3000000 }
                    }
                }
            }
        }"#;

        let stage: StageAttempt = serde_json::from_str(json).unwrap();
        assert_eq!(stage.key(), StageKey::new(3, 0));
        assert_eq!(stage.status, StageStatus::Complete);
        assert_eq!(stage.submission_time, Some(1_709_288_130_123));
        let task = &stage.tasks[&12];
        assert_eq!(task.launch_time, Some(1_709_288_130_200));
        let metrics = task.task_metrics.as_ref().unwrap();
        assert!(metrics.has_timing());
        assert_eq!(metrics.shuffle_write_metrics.as_ref().unwrap().write_time, 3_000_000);
    }

    #[test]
    fn job_with_unrecognised_status_is_unknown() {
        let json = r#"{"jobId": 7, "status": "QUEUED", "stageIds": [1, 2]}"#;
        let job: JobSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
        assert_eq!(job.stage_ids, vec![1, 2]);
        assert_eq!(job.submission_time, None);
    }

    #[test]
    fn executor_host_strips_port() {
        let exec = ExecutorSummary {
            id: "4".into(),
            total_cores: 2,
            host_port: "10.0.0.4:39112".into(),
        };
        assert_eq!(exec.host(), "10.0.0.4");
        assert!(!exec.is_driver());
    }

    #[test]
    fn blank_app_id_is_treated_as_unknown() {
        let snap = SessionSnapshot {
            state: "idle".into(),
            app_id: Some("  ".into()),
        };
        assert_eq!(snap.known_app_id(), None);
    }
}
