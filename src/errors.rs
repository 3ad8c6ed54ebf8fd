// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::SessionStatus;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Failure reported by the remote client. Never interpreted here.
    #[error("Transport error: {0}")]
    Transport(#[source] anyhow::Error),

    /// The statement finished with an `error` output.
    #[error("Statement execution error: {evalue}\n{traceback}")]
    StatementExecution { evalue: String, traceback: String },

    #[error("Unexpected status: {0}")]
    UnexpectedStatus(String),

    #[error("Session cannot accept statements (status: {0})")]
    SessionUnavailable(SessionStatus),

    #[error("Invalid statement output: {0}")]
    InvalidOutput(String),

    #[error("Statement monitoring cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MonitorError {
    /// Wrap any client-side failure as a transport error.
    pub fn transport(err: impl Into<anyhow::Error>) -> Self {
        MonitorError::Transport(err.into())
    }

    /// Whether the next poll cycle may retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, MonitorError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
