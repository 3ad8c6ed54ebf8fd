// src/config/mod.rs

//! Monitor configuration.
//!
//! - [`model`] holds the serde-facing raw struct and the validated
//!   [`MonitorConfig`].
//! - [`validate`] turns the former into the latter.
//! - [`loader`] parses TOML text. Locating and reading config files is
//!   left to the embedding application.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::from_toml_str;
pub use model::{MonitorConfig, RawMonitorConfig};
