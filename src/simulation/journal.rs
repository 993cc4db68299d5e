use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub offset_ms: u64,
    pub resource: String,
    pub event: String,
}

/// Shared, ordered log of resource events with offsets from its creation.
///
/// Offsets come from tokio's clock, so they are exact under a paused test
/// runtime.
#[derive(Debug, Clone)]
pub struct Journal {
    origin: Instant,
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn record(&self, resource: &str, event: &str) {
        let offset_ms = self.origin.elapsed().as_millis() as u64;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(JournalEntry {
                offset_ms,
                resource: resource.to_string(),
                event: event.to_string(),
            });
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sequence number of the first matching entry
    pub fn position(&self, resource: &str, event: &str) -> Option<usize> {
        self.entries()
            .iter()
            .position(|entry| entry.resource == resource && entry.event == event)
    }

    /// Offset of the first matching entry
    pub fn offset_ms(&self, resource: &str, event: &str) -> Option<u64> {
        self.entries()
            .into_iter()
            .find(|entry| entry.resource == resource && entry.event == event)
            .map(|entry| entry.offset_ms)
    }
}
