// src/keeper/mod.rs

//! Idle-timeout watchdog ("keeper").
//!
//! Runs as its own tokio task for the whole life of a session,
//! independent of any statement being monitored:
//! - polls only the session status, on a fixed interval
//! - stops by itself once the session is terminal
//! - measures idle time since the last `busy` observation and forces the
//!   session into a sticky `Timeout` status when it exceeds the limit
//!
//! [`SessionShared`] is the only state it shares with the rest of the
//! crate.

pub mod shared;
pub mod watchdog;

pub use shared::SessionShared;
pub use watchdog::{IdleWatchdog, KeeperExit, KeeperHandle, KeeperTelemetry};
