// src/events/sink.rs

//! Downstream event sinks.
//!
//! Publishing is one-way and best-effort: a sink never reports failure to
//! the reconciler and never applies backpressure.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::SparkEvent;

/// One-way channel for lifecycle events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: SparkEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn publish(&self, event: SparkEvent) {
        (**self).publish(event);
    }
}

/// Forwards events over an unbounded tokio channel.
///
/// Events published after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SparkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SparkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: SparkEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!(kind = err.0.kind(), "event receiver gone; dropping event");
        }
    }
}

/// Writes one JSON object per line.
///
/// Serialization or write failures are logged and the event is dropped.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn publish(&self, event: SparkEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                warn!(kind = event.kind(), error = %err, "failed to serialize event");
                return;
            }
        };

        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            warn!(kind = event.kind(), error = %err, "failed to write event");
        }
    }
}
