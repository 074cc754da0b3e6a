// cardsession/src/event_sink.rs

//! Human-readable progress notifications ("Opening session: SUCCESS").

use std::sync::{Arc, Mutex};

use derive_more::Display;

/// Write-only sink for progress notifications.
pub trait EventSink: Send {
    fn header(&mut self, text: &str);
    fn action(&mut self, text: &str);
    fn result(&mut self, text: &str);
}

/// Forwards notifications to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn header(&mut self, text: &str) {
        log::info!("== {} ==", text);
    }

    fn action(&mut self, text: &str) {
        log::info!("> {}", text);
    }

    fn result(&mut self, text: &str) {
        log::info!("< {}", text);
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    #[display(fmt = "header")]
    Header,
    #[display(fmt = "action")]
    Action,
    #[display(fmt = "result")]
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEntry {
    pub kind: SinkKind,
    pub text: String,
}

/// Keeps every notification in memory. Clones share the same buffer, so a
/// clone can be handed to a session and inspected afterwards.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<SinkEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn results(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.kind == SinkKind::Result)
            .map(|e| e.text)
            .collect()
    }

    fn push(&self, kind: SinkKind, text: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(SinkEntry {
                kind,
                text: text.to_string(),
            });
        }
    }
}

impl EventSink for MemorySink {
    fn header(&mut self, text: &str) {
        self.push(SinkKind::Header, text);
    }

    fn action(&mut self, text: &str) {
        self.push(SinkKind::Action, text);
    }

    fn result(&mut self, text: &str) {
        self.push(SinkKind::Result, text);
    }
}
