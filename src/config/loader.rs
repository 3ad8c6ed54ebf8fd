// src/config/loader.rs

use crate::config::model::{MonitorConfig, RawMonitorConfig};
use crate::errors::Result;

/// Parse TOML text into a raw config without semantic checks.
pub fn raw_from_toml_str(contents: &str) -> Result<RawMonitorConfig> {
    let config: RawMonitorConfig = toml::from_str(contents)?;
    Ok(config)
}

/// Parse TOML text and validate it.
///
/// This is the recommended entry point:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Rejects zero intervals, timeouts and retry budgets.
pub fn from_toml_str(contents: &str) -> Result<MonitorConfig> {
    let raw = raw_from_toml_str(contents)?;
    MonitorConfig::try_from(raw)
}
