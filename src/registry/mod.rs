//! Sink and routing registry
//!
//! Logger instances own sinks (output destinations) and routing rules (which
//! records reach which sink). The registry pools live loggers and keeps one
//! shared sink configuration that is the union of everything they own.

pub mod handle;
pub mod logger;
pub mod pool;
pub mod shared;

pub use handle::LoggerHandle;
pub use logger::{Logger, LoggerId, LoggerInfo};
pub use pool::LoggerRegistry;
pub use shared::SinkConfiguration;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::level::LogLevel;
use crate::logging::LogBuffer;
use crate::pattern::Wildcard;

/// Where a sink writes
#[derive(Debug, Clone)]
pub enum SinkKind {
    /// Standard output
    Console,
    /// Append to a file, rolling over to a new timestamped file past `max_bytes`
    File {
        path: PathBuf,
        max_bytes: Option<u64>,
    },
    /// In-memory ring buffer
    Memory(Arc<LogBuffer>),
}

impl SinkKind {
    /// Short label for diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File { .. } => "file",
            SinkKind::Memory(_) => "memory",
        }
    }
}

/// A named output destination with a format template
///
/// Identity is the name: two sinks with the same name are the same sink as far
/// as the shared configuration is concerned.
#[derive(Debug, Clone)]
pub struct Sink {
    /// Unique name
    pub name: String,
    /// Destination
    pub kind: SinkKind,
    /// Format template (see [`render_template`])
    pub template: String,
}

impl Sink {
    /// Create a new sink
    pub fn new(name: impl Into<String>, kind: SinkKind, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            template: template.into(),
        }
    }

    /// Console sink
    pub fn console(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(name, SinkKind::Console, template)
    }

    /// File sink without size-based rollover
    pub fn file(name: impl Into<String>, path: PathBuf, template: impl Into<String>) -> Self {
        Self::new(
            name,
            SinkKind::File {
                path,
                max_bytes: None,
            },
            template,
        )
    }

    /// Memory sink backed by `buffer`
    pub fn memory(
        name: impl Into<String>,
        buffer: Arc<LogBuffer>,
        template: impl Into<String>,
    ) -> Self {
        Self::new(name, SinkKind::Memory(buffer), template)
    }
}

/// Binds a logger-name pattern and a severity window to one sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    /// Unique name, `{logger id}:{sink name}`
    pub name: String,
    /// Logger names this rule applies to
    pub logger_pattern: Wildcard,
    /// Lowest level routed
    pub min_level: LogLevel,
    /// Highest level routed
    pub max_level: LogLevel,
    /// Name of the target sink
    pub sink: String,
}

impl RoutingRule {
    /// Check whether a record from `logger` at `level` goes through this rule
    pub fn accepts(&self, logger: &str, level: LogLevel) -> bool {
        level.within(self.min_level, self.max_level) && self.logger_pattern.matches(logger)
    }
}

/// A single change to the shared configuration
///
/// Logger mutations return these instead of touching shared state; the
/// registry applies them under its locks.
#[derive(Debug, Clone)]
pub enum RoutingChange {
    AddSink(Sink),
    RemoveSink(String),
    AddRule(RoutingRule),
    RemoveRule(String),
}

impl RoutingChange {
    /// Name of the sink or rule this change is about
    pub fn name(&self) -> &str {
        match self {
            RoutingChange::AddSink(sink) => &sink.name,
            RoutingChange::RemoveSink(name) => name,
            RoutingChange::AddRule(rule) => &rule.name,
            RoutingChange::RemoveRule(name) => name,
        }
    }
}

/// A record on its way to the sinks
#[derive(Debug, Clone)]
pub struct LogRecord<'a> {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub logger: &'a str,
    pub message: &'a str,
    pub properties: &'a [(String, String)],
}

impl<'a> LogRecord<'a> {
    /// Create a record stamped with the current time
    pub fn new(
        level: LogLevel,
        logger: &'a str,
        message: &'a str,
        properties: &'a [(String, String)],
    ) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            logger,
            message,
            properties,
        }
    }
}

/// Render a record through a template
///
/// Placeholders: `{timestamp}`, `{date}`, `{time}`, `{level}`, `{logger}`,
/// `{message}`, `{properties}`. Unknown text is copied verbatim. Properties not
/// referenced by the template are appended as `key=value` pairs.
pub fn render_template(template: &str, record: &LogRecord<'_>) -> String {
    let properties = record
        .properties
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ");

    let mut line = template
        .replace(
            "{timestamp}",
            &record
                .timestamp
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
        )
        .replace("{date}", &record.timestamp.format("%Y-%m-%d").to_string())
        .replace("{time}", &record.timestamp.format("%H:%M:%S%.3f").to_string())
        .replace("{level}", &format!("{:<5}", record.level.as_str()))
        .replace("{logger}", record.logger);

    let has_properties_slot = line.contains("{properties}");
    line = line.replace("{properties}", &properties);
    // Message last so braces inside it are never treated as placeholders
    line = line.replace("{message}", record.message);

    if !has_properties_slot && !properties.is_empty() {
        line.push(' ');
        line.push_str(&properties);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let props = vec![("container".to_string(), "a.zip".to_string())];
        let record = LogRecord::new(LogLevel::Warn, "Archiver_1a2b", "disk {full}", &props);
        let line = render_template("[{level}] {logger}: {message}", &record);
        assert_eq!(line, "[WARN ] Archiver_1a2b: disk {full} container=a.zip");
    }

    #[test]
    fn test_render_template_with_properties_slot() {
        let props = vec![("k".to_string(), "v".to_string())];
        let record = LogRecord::new(LogLevel::Info, "L", "m", &props);
        let line = render_template("{message} ({properties})", &record);
        assert_eq!(line, "m (k=v)");
    }

    #[test]
    fn test_rule_accepts() {
        let rule = RoutingRule {
            name: "r".to_string(),
            logger_pattern: Wildcard::new("Archiver_*"),
            min_level: LogLevel::Info,
            max_level: LogLevel::Error,
            sink: "s".to_string(),
        };
        assert!(rule.accepts("Archiver_1", LogLevel::Warn));
        assert!(!rule.accepts("Archiver_1", LogLevel::Debug));
        assert!(!rule.accepts("Session_1", LogLevel::Warn));
    }
}
