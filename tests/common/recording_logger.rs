use std::error::Error as StdError;

use parking_lot::Mutex;
use storefront_events::logging::ConsumerErrorLogger;

/// One recorded `ConsumerErrorLogger::error` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub description: String,
    pub error: Option<String>,
}

/// Error logger that keeps every entry for assertions
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Entries whose description names the given consumer identity
    pub fn entries_for(&self, identity: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.description == identity)
            .cloned()
            .collect()
    }
}

impl ConsumerErrorLogger for RecordingLogger {
    fn error(&self, description: &str, error: Option<&(dyn StdError + 'static)>) {
        self.entries.lock().push(LogEntry {
            description: description.to_string(),
            error: error.map(|e| e.to_string()),
        });
    }
}
