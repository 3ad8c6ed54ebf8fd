use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use sparkmon::clock::Clock;
use sparkmon::events::{EventBody, EventSink, SparkEvent};
use sparkmon::reconcile::OutputSink;

/// Event sink that keeps everything it is given, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SparkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SparkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<EventBody> {
        self.events().into_iter().map(|e| e.body).collect()
    }

    /// `msgtype` of every event, in publish order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: SparkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Displayed {
    Image { mime: String, bytes: Vec<u8> },
    Html(String),
    Text(String),
}

/// Output sink that records what would have been displayed.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    shown: Mutex<Vec<Displayed>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<Displayed> {
        self.shown.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingOutput {
    fn display_image(&self, mime: &str, bytes: &[u8]) {
        self.shown.lock().unwrap().push(Displayed::Image {
            mime: mime.to_string(),
            bytes: bytes.to_vec(),
        });
    }

    fn display_html(&self, html: &str) {
        self.shown.lock().unwrap().push(Displayed::Html(html.to_string()));
    }

    fn write_text(&self, text: &str) {
        self.shown.lock().unwrap().push(Displayed::Text(text.to_string()));
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1_700_000_000_000)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
