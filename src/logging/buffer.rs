//! In-memory log buffer
//!
//! Thread-safe ring buffer backing the `Memory` sink kind. Useful for live log
//! views and for asserting on routed output in tests.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::level::LogLevel;

/// A single record captured by a memory sink
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Timestamp when the record was written
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: LogLevel,
    /// Display name of the logger that produced the record
    pub logger: String,
    /// Record rendered through the sink's template
    pub rendered: String,
    /// Raw message
    pub message: String,
}

impl LogEntry {
    /// Create a new log entry
    pub fn new(
        level: LogLevel,
        logger: impl Into<String>,
        message: impl Into<String>,
        rendered: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger: logger.into(),
            rendered: rendered.into(),
            message: message.into(),
        }
    }
}

/// Thread-safe ring buffer for storing log entries
#[derive(Debug)]
pub struct LogBuffer {
    /// All log entries (capped at max_entries)
    entries: RwLock<VecDeque<LogEntry>>,
    /// Maximum entries to keep
    max_entries: usize,
}

impl LogBuffer {
    /// Create a new log buffer holding at most `max_entries` entries
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries)),
            max_entries,
        }
    }

    /// Push a new log entry, evicting the oldest when full
    pub fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    /// Get all entries as a vector
    pub fn all_entries(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the number of entries in the buffer
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: LogLevel, message: &str) -> LogEntry {
        LogEntry::new(level, "test", message, message)
    }

    #[test]
    fn test_log_buffer_push_and_retrieve() {
        let buffer = LogBuffer::new(100);

        buffer.push(entry(LogLevel::Info, "message 1"));
        buffer.push(entry(LogLevel::Warn, "warning 1"));
        buffer.push(entry(LogLevel::Fatal, "fatal 1"));

        assert_eq!(buffer.len(), 3);

        let entries = buffer.all_entries();
        assert_eq!(entries[0].message, "message 1");
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(entries[2].message, "fatal 1");
    }

    #[test]
    fn test_log_buffer_capacity() {
        let buffer = LogBuffer::new(3);

        for i in 0..5 {
            buffer.push(entry(LogLevel::Info, &format!("msg {}", i)));
        }

        assert_eq!(buffer.len(), 3);
        let entries = buffer.all_entries();
        assert_eq!(entries[0].message, "msg 2");
        assert_eq!(entries[1].message, "msg 3");
        assert_eq!(entries[2].message, "msg 4");
    }
}
