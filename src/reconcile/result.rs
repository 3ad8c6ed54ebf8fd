// src/reconcile/result.rs

//! Interpreting a finished statement's output.
//!
//! [`interpret`] turns the raw output payload into a [`StatementResult`]
//! or an error; [`StatementResult::render`] hands it to an
//! [`OutputSink`] for display.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::client::model::StatementOutput;
use crate::errors::{MonitorError, Result};

const MIME_HTML: &str = "text/html";
const MIME_PLAIN: &str = "text/plain";
const MIME_IMAGE_PREFIX: &str = "image/";

/// Display target for statement results.
pub trait OutputSink: Send + Sync {
    fn display_image(&self, mime: &str, bytes: &[u8]);
    fn display_html(&self, html: &str);
    fn write_text(&self, text: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementResult {
    NoOutput,
    Text(String),
    Html(String),
    Image { mime: String, bytes: Vec<u8> },
}

impl StatementResult {
    pub fn render(&self, out: &dyn OutputSink) {
        match self {
            StatementResult::NoOutput => {}
            StatementResult::Text(text) => out.write_text(text),
            StatementResult::Html(html) => out.display_html(html),
            StatementResult::Image { mime, bytes } => out.display_image(mime, bytes),
        }
    }
}

/// Dispatch on the declared output status.
pub fn interpret(output: Option<&StatementOutput>) -> Result<StatementResult> {
    let Some(output) = output else {
        return Ok(StatementResult::NoOutput);
    };

    match output.status.as_str() {
        "ok" => interpret_ok(output),
        "error" => Err(MonitorError::StatementExecution {
            evalue: output.evalue.clone().unwrap_or_default(),
            traceback: output.traceback.concat(),
        }),
        other => Err(MonitorError::UnexpectedStatus(other.to_string())),
    }
}

fn interpret_ok(output: &StatementOutput) -> Result<StatementResult> {
    if let Some((mime, payload)) = output
        .data
        .iter()
        .find(|(mime, _)| mime.starts_with(MIME_IMAGE_PREFIX))
    {
        let encoded: String = text_of(payload)
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| MonitorError::InvalidOutput(format!("{mime}: {e}")))?;
        return Ok(StatementResult::Image {
            mime: mime.clone(),
            bytes,
        });
    }

    if let Some(html) = output.data.get(MIME_HTML) {
        return Ok(StatementResult::Html(text_of(html)));
    }

    if let Some(text) = output.data.get(MIME_PLAIN) {
        return Ok(StatementResult::Text(text_of(text)));
    }

    Ok(StatementResult::NoOutput)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
