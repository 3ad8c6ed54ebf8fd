// src/config/validate.rs

use crate::config::model::{MonitorConfig, RawMonitorConfig};
use crate::errors::{MonitorError, Result};

impl TryFrom<RawMonitorConfig> for MonitorConfig {
    type Error = crate::errors::MonitorError;

    fn try_from(raw: RawMonitorConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(MonitorConfig::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawMonitorConfig) -> Result<()> {
    validate_intervals(cfg)?;
    validate_budgets(cfg)?;
    Ok(())
}

fn validate_intervals(cfg: &RawMonitorConfig) -> Result<()> {
    if cfg.poll_interval_ms == 0 {
        return Err(MonitorError::ConfigError(
            "poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.keeper_interval_secs == 0 {
        return Err(MonitorError::ConfigError(
            "keeper_interval_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.session_timeout_secs == 0 {
        return Err(MonitorError::ConfigError(
            "session_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_budgets(cfg: &RawMonitorConfig) -> Result<()> {
    if cfg.max_consecutive_failures == 0 {
        return Err(MonitorError::ConfigError(
            "max_consecutive_failures must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.log_batch_size == 0 {
        return Err(MonitorError::ConfigError(
            "log_batch_size must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
