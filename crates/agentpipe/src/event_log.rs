//! Shared append-only log of injected events
//!
//! Holds side-channel events pushed into a session from outside the child
//! process, such as the initial system-prompt handshake. External callers may
//! read the log while the session appends to it, so both operations go
//! through a lock and readers only ever get snapshot copies, so a concurrent
//! append can never tear a read.

use serde_json::Value;
use std::sync::Mutex;

/// Mutex-guarded append-only event log
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Mutex<Vec<Value>>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event and return a snapshot that includes it
    pub fn append(&self, event: Value) -> Vec<Value> {
        let mut entries = self.lock();
        entries.push(event);
        entries.clone()
    }

    /// Read-only copy of the log
    pub fn snapshot(&self) -> Vec<Value> {
        self.lock().clone()
    }

    /// Number of logged events
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Value>> {
        // A poisoned lock only means another appender panicked; the log
        // itself is still a valid vector.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
