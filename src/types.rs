// src/types.rs

//! Identifiers and status enums shared across the crate.
//!
//! Remote state strings are parsed into these enums at the boundary.
//! Statement and session states come from Livy; job and stage statuses
//! from the Spark monitoring API. Task status is never read from the
//! wire; it is derived (see [`TaskStatus::derive`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MonitorError;

pub type SessionId = i64;
pub type StatementId = i64;
pub type JobId = i64;
pub type StageId = i64;
pub type AttemptId = i64;
pub type TaskId = i64;

/// A stage is identified by its id plus the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageKey {
    pub stage_id: StageId,
    pub attempt_id: AttemptId,
}

impl StageKey {
    pub fn new(stage_id: StageId, attempt_id: AttemptId) -> Self {
        Self {
            stage_id,
            attempt_id,
        }
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stage_id, self.attempt_id)
    }
}

/// Livy session state, plus the locally enforced `Timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    Starting,
    Recovering,
    Idle,
    Busy,
    ShuttingDown,
    Error,
    Dead,
    Killed,
    Success,
    /// Set by the idle watchdog; never reported by the remote side.
    Timeout,
}

impl SessionStatus {
    const ALL: [SessionStatus; 11] = [
        SessionStatus::NotStarted,
        SessionStatus::Starting,
        SessionStatus::Recovering,
        SessionStatus::Idle,
        SessionStatus::Busy,
        SessionStatus::ShuttingDown,
        SessionStatus::Error,
        SessionStatus::Dead,
        SessionStatus::Killed,
        SessionStatus::Success,
        SessionStatus::Timeout,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::ShuttingDown
                | SessionStatus::Error
                | SessionStatus::Dead
                | SessionStatus::Killed
                | SessionStatus::Success
                | SessionStatus::Timeout
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::Starting => "starting",
            SessionStatus::Recovering => "recovering",
            SessionStatus::Idle => "idle",
            SessionStatus::Busy => "busy",
            SessionStatus::ShuttingDown => "shutting_down",
            SessionStatus::Error => "error",
            SessionStatus::Dead => "dead",
            SessionStatus::Killed => "killed",
            SessionStatus::Success => "success",
            SessionStatus::Timeout => "timeout",
        }
    }

    /// Compact encoding used by the shared atomic session state.
    pub(crate) fn to_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        Self::ALL
            .get(raw as usize)
            .copied()
            .unwrap_or(SessionStatus::Error)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "not_started" => Ok(SessionStatus::NotStarted),
            "starting" => Ok(SessionStatus::Starting),
            "recovering" => Ok(SessionStatus::Recovering),
            "idle" => Ok(SessionStatus::Idle),
            "busy" => Ok(SessionStatus::Busy),
            "shutting_down" => Ok(SessionStatus::ShuttingDown),
            "error" => Ok(SessionStatus::Error),
            "dead" => Ok(SessionStatus::Dead),
            "killed" => Ok(SessionStatus::Killed),
            "success" => Ok(SessionStatus::Success),
            other => Err(MonitorError::UnexpectedStatus(format!(
                "session state '{other}'"
            ))),
        }
    }
}

/// Livy statement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Waiting,
    Running,
    Available,
    Error,
    Cancelling,
    Cancelled,
}

impl StatementState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StatementState::Available | StatementState::Error | StatementState::Cancelled
        )
    }
}

impl FromStr for StatementState {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "waiting" => Ok(StatementState::Waiting),
            "running" => Ok(StatementState::Running),
            "available" => Ok(StatementState::Available),
            "error" => Ok(StatementState::Error),
            "cancelling" => Ok(StatementState::Cancelling),
            "cancelled" => Ok(StatementState::Cancelled),
            other => Err(MonitorError::UnexpectedStatus(format!(
                "statement state '{other}'"
            ))),
        }
    }
}

/// Spark job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Unknown
    }
}

/// Spark stage status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageStatus {
    Pending,
    Active,
    Complete,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StageStatus::Complete | StageStatus::Failed | StageStatus::Skipped
        )
    }

    /// Status reported for a stage whose job ended before the stage did.
    ///
    /// - a stage that never started is reported `Skipped`
    /// - a started stage inherits its job's outcome
    pub fn forced_terminal(self, job_succeeded: bool) -> StageStatus {
        match self {
            s if s.is_terminal() => s,
            StageStatus::Pending => StageStatus::Skipped,
            _ if job_succeeded => StageStatus::Complete,
            _ => StageStatus::Failed,
        }
    }
}

impl Default for StageStatus {
    fn default() -> Self {
        StageStatus::Pending
    }
}

/// Derived task status. There is no intermediate state besides `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Running,
    Success,
    Failed,
}

impl TaskStatus {
    /// Map the optional fields of a raw task record into one tag.
    ///
    /// - an error message means the task failed
    /// - recognizable non-zero timing metrics mean it finished
    /// - anything else is still running
    pub fn derive(has_error: bool, has_timing: bool) -> TaskStatus {
        if has_error {
            TaskStatus::Failed
        } else if has_timing {
            TaskStatus::Success
        } else {
            TaskStatus::Running
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

/// Log level selection for [`crate::logging::init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
