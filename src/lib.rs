// src/lib.rs

//! Spark job monitoring over a pull-only remote service.
//!
//! The remote side (Livy plus the Spark monitoring REST API) can only be
//! polled. This crate turns those polls into an ordered stream of
//! lifecycle events for jobs, stages, tasks and executors, and enforces a
//! session idle timeout on the side:
//! - [`reconcile`] polls one statement to completion and publishes events
//! - [`keeper`] is the idle-timeout watchdog
//! - [`session`] ties both to one remote session and holds the submit gate
//!
//! The HTTP client and the event consumer are supplied by the caller
//! through [`client::RemoteExecutionClient`] and [`events::EventSink`].

pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod events;
pub mod keeper;
pub mod logging;
pub mod reconcile;
pub mod session;
pub mod tracker;
pub mod types;

pub use client::RemoteExecutionClient;
pub use config::MonitorConfig;
pub use errors::{MonitorError, Result};
pub use events::{EventBody, EventSink, SparkEvent};
pub use reconcile::{OutputSink, Reconciler, StatementContext, StatementResult};
pub use session::{SessionController, StatementRequest};
