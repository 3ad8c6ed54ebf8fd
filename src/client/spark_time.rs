// src/client/spark_time.rs

//! Spark REST date handling.
//!
//! The monitoring API renders dates as `2024-03-01T10:15:30.123GMT`.
//! Test fixtures and some proxies send plain millisecond epochs instead,
//! so both forms are accepted.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};

const SPARK_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Millis(i64),
    Text(String),
}

/// Parse a Spark date into milliseconds since the epoch (UTC).
pub fn parse(value: &str) -> Result<i64, chrono::ParseError> {
    let trimmed = value.trim().trim_end_matches("GMT");
    NaiveDateTime::parse_from_str(trimmed, SPARK_DATE_FORMAT)
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// `deserialize_with` helper for optional Spark dates.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawTime>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTime::Millis(ms)) => Ok(Some(ms)),
        Some(RawTime::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawTime::Text(text)) => parse(&text).map(Some).map_err(serde::de::Error::custom),
    }
}
