//! Scoped logger handles
//!
//! A `LoggerHandle` is what callers hold on to. Releasing it (explicitly or by
//! dropping it) destroys the logger exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::level::LogLevel;

use super::{LogRecord, Logger, LoggerId, LoggerRegistry, Sink};

/// Handle to a registered logger
#[derive(Debug)]
pub struct LoggerHandle {
    registry: Arc<LoggerRegistry>,
    id: LoggerId,
    name: String,
    min_level: LogLevel,
    max_level: LogLevel,
    released: AtomicBool,
}

impl LoggerHandle {
    pub(crate) fn new(registry: Arc<LoggerRegistry>, logger: &Logger) -> Self {
        Self {
            registry,
            id: logger.id,
            name: logger.name.clone(),
            min_level: logger.min_level,
            max_level: logger.max_level,
            released: AtomicBool::new(false),
        }
    }

    /// Logger id
    pub fn id(&self) -> LoggerId {
        self.id
    }

    /// Logger display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registry this logger lives in
    pub fn registry(&self) -> &Arc<LoggerRegistry> {
        &self.registry
    }

    /// Check whether the handle has been released
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Check whether a record at `level` would be emitted
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        !self.is_released() && level.within(self.min_level, self.max_level)
    }

    /// Attach a sink to this logger and mirror it into the shared configuration
    ///
    /// Returns true if the logger is live and the sink was new to it.
    pub fn register_target(&self, sink: Sink) -> bool {
        self.registry
            .update(self.id, |logger| logger.register_target(sink))
            .is_some_and(|changes| !changes.is_empty())
    }

    /// Attach a sink with a narrower severity window
    pub fn register_target_with_levels(&self, sink: Sink, min: LogLevel, max: LogLevel) -> bool {
        self.registry
            .update(self.id, |logger| {
                logger.register_target_with_levels(sink, min, max)
            })
            .is_some_and(|changes| !changes.is_empty())
    }

    /// Detach a sink by name
    pub fn remove_target(&self, sink_name: &str) -> bool {
        self.registry
            .update(self.id, |logger| logger.remove_target(sink_name))
            .is_some_and(|changes| !changes.is_empty())
    }

    /// Write a record with scoped properties
    ///
    /// Returns the number of sinks that received it.
    pub fn log_with(
        &self,
        level: LogLevel,
        properties: &[(String, String)],
        message: &str,
    ) -> usize {
        if !self.is_enabled(level) {
            return 0;
        }
        let record = LogRecord::new(level, &self.name, message, properties);
        self.registry.shared().write(&record)
    }

    /// Write a record
    pub fn log(&self, level: LogLevel, message: &str) -> usize {
        self.log_with(level, &[], message)
    }

    pub fn trace(&self, message: &str) -> usize {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> usize {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> usize {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> usize {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> usize {
        self.log(LogLevel::Error, message)
    }

    pub fn fatal(&self, message: &str) -> usize {
        self.log(LogLevel::Fatal, message)
    }

    /// Destroy the logger, retracting what nobody else owns
    ///
    /// Only the first call does anything; later calls and the eventual drop
    /// are no-ops that report true.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return true;
        }
        self.registry.destroy(self.id)
    }
}

impl Drop for LoggerHandle {
    fn drop(&mut self) {
        self.release();
    }
}
