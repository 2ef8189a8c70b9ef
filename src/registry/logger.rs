//! Logger instances
//!
//! A logger owns its sinks and the rules routing its records to them. It never
//! touches the shared configuration itself: every mutation returns the
//! [`RoutingChange`]s the registry has to apply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::level::LogLevel;
use crate::pattern::Wildcard;

use super::{RoutingChange, RoutingRule, Sink};

/// Unique identifier for a logger
pub type LoggerId = Uuid;

/// A logger instance and the sinks/rules it owns
#[derive(Debug, Clone)]
pub struct Logger {
    /// Unique identifier
    pub id: LoggerId,
    /// Display name, `{caller name}_{short id}`
    pub name: String,
    /// Kind of component that owns this logger (e.g. "archiver")
    pub category: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Lowest level this logger emits
    pub min_level: LogLevel,
    /// Highest level this logger emits
    pub max_level: LogLevel,
    /// Protected loggers route every logger's records and survive other teardowns
    pub protected: bool,
    /// Pattern its rules match against logger names
    rule_pattern: Wildcard,
    sinks: Vec<Sink>,
    rules: Vec<RoutingRule>,
}

/// Read-only snapshot of a pooled logger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerInfo {
    pub id: LoggerId,
    pub name: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub min_level: LogLevel,
    pub max_level: LogLevel,
    pub protected: bool,
    pub sinks: Vec<String>,
    pub rules: Vec<String>,
}

impl Logger {
    /// Create a new logger with the window `min_level..=max_level`
    ///
    /// A reversed window is swapped into order.
    pub fn new(
        name: &str,
        category: impl Into<String>,
        min_level: LogLevel,
        max_level: LogLevel,
    ) -> Self {
        let id = Uuid::new_v4();
        let display_name = display_name(name, &id);
        let (min_level, max_level) = if min_level <= max_level {
            (min_level, max_level)
        } else {
            (max_level, min_level)
        };

        Self {
            id,
            rule_pattern: Wildcard::new(&display_name),
            name: display_name,
            category: category.into(),
            created_at: Utc::now(),
            min_level,
            max_level,
            protected: false,
            sinks: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Mark as protected; its rules then apply to every logger name
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self.rule_pattern = Wildcard::new("*");
        self
    }

    /// Sinks owned by this logger
    pub fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    /// Rules owned by this logger
    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Check whether this logger owns a sink or rule named `name`
    pub fn owns(&self, name: &str) -> bool {
        self.sinks.iter().any(|s| s.name == name) || self.rules.iter().any(|r| r.name == name)
    }

    /// Check whether a record at `level` passes this logger's window
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.within(self.min_level, self.max_level)
    }

    /// Rule name for a sink owned by this logger
    pub fn rule_name(&self, sink_name: &str) -> String {
        format!("{}:{}", self.id, sink_name)
    }

    /// Attach a sink routed with this logger's full window
    pub fn register_target(&mut self, sink: Sink) -> Vec<RoutingChange> {
        let (min, max) = (self.min_level, self.max_level);
        self.register_target_with_levels(sink, min, max)
    }

    /// Attach a sink routed with `min..=max`, clamped to this logger's window
    ///
    /// Re-registering a sink name already attached is a no-op.
    pub fn register_target_with_levels(
        &mut self,
        sink: Sink,
        min: LogLevel,
        max: LogLevel,
    ) -> Vec<RoutingChange> {
        if self.sinks.iter().any(|s| s.name == sink.name) {
            return Vec::new();
        }

        let min = min.clamp_to(self.min_level, self.max_level);
        let max = max.clamp_to(min, self.max_level);
        let rule = RoutingRule {
            name: self.rule_name(&sink.name),
            logger_pattern: self.rule_pattern.clone(),
            min_level: min,
            max_level: max,
            sink: sink.name.clone(),
        };

        self.sinks.push(sink.clone());
        self.rules.push(rule.clone());
        vec![RoutingChange::AddSink(sink), RoutingChange::AddRule(rule)]
    }

    /// Detach a sink and every rule that targets it
    pub fn remove_target(&mut self, sink_name: &str) -> Vec<RoutingChange> {
        let mut changes = Vec::new();

        let removed_rules: Vec<String> = self
            .rules
            .iter()
            .filter(|r| r.sink == sink_name)
            .map(|r| r.name.clone())
            .collect();
        self.rules.retain(|r| r.sink != sink_name);
        changes.extend(removed_rules.into_iter().map(RoutingChange::RemoveRule));

        let before = self.sinks.len();
        self.sinks.retain(|s| s.name != sink_name);
        if self.sinks.len() != before {
            changes.push(RoutingChange::RemoveSink(sink_name.to_string()));
        }

        changes
    }

    /// Changes that publish everything this logger owns
    pub fn publish_changes(&self) -> Vec<RoutingChange> {
        let sinks = self.sinks.iter().cloned().map(RoutingChange::AddSink);
        let rules = self.rules.iter().cloned().map(RoutingChange::AddRule);
        sinks.chain(rules).collect()
    }

    /// Changes that retract everything this logger owns
    ///
    /// Rules come first so no rule is left pointing at a removed sink.
    pub fn retract_changes(&self) -> Vec<RoutingChange> {
        let rules = self
            .rules
            .iter()
            .map(|r| RoutingChange::RemoveRule(r.name.clone()));
        let sinks = self
            .sinks
            .iter()
            .map(|s| RoutingChange::RemoveSink(s.name.clone()));
        rules.chain(sinks).collect()
    }

    /// Snapshot for queries
    pub fn info(&self) -> LoggerInfo {
        LoggerInfo {
            id: self.id,
            name: self.name.clone(),
            category: self.category.clone(),
            created_at: self.created_at,
            min_level: self.min_level,
            max_level: self.max_level,
            protected: self.protected,
            sinks: self.sinks.iter().map(|s| s.name.clone()).collect(),
            rules: self.rules.iter().map(|r| r.name.clone()).collect(),
        }
    }
}

/// `{name}_{first 8 hex digits of id}`, with wildcard characters replaced
fn display_name(name: &str, id: &LoggerId) -> String {
    let base: String = name
        .trim()
        .chars()
        .map(|c| if c == '*' || c == '?' { '_' } else { c })
        .collect();
    let base = if base.is_empty() { "Logger" } else { &base };
    let short = id.simple().to_string();
    format!("{}_{}", base, &short[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let logger = Logger::new("Archiver", "archiver", LogLevel::Info, LogLevel::Fatal);
        assert!(logger.name.starts_with("Archiver_"));
        assert_eq!(logger.name.len(), "Archiver_".len() + 8);

        let odd = Logger::new("a*b", "x", LogLevel::Info, LogLevel::Fatal);
        assert!(odd.name.starts_with("a_b_"));
    }

    #[test]
    fn test_reversed_window_is_ordered() {
        let logger = Logger::new("L", "x", LogLevel::Error, LogLevel::Debug);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert_eq!(logger.max_level, LogLevel::Error);
    }

    #[test]
    fn test_register_target_returns_diff() {
        let mut logger = Logger::new("L", "x", LogLevel::Info, LogLevel::Error);
        let changes = logger.register_target(Sink::console("console", "{message}"));

        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], RoutingChange::AddSink(s) if s.name == "console"));
        assert!(
            matches!(&changes[1], RoutingChange::AddRule(r) if r.sink == "console" && r.name == logger.rule_name("console"))
        );

        // Same name again changes nothing
        assert!(logger
            .register_target(Sink::console("console", "{level}"))
            .is_empty());
    }

    #[test]
    fn test_rule_window_is_clamped() {
        let mut logger = Logger::new("L", "x", LogLevel::Info, LogLevel::Error);
        logger.register_target_with_levels(
            Sink::console("c", "{message}"),
            LogLevel::Trace,
            LogLevel::Off,
        );
        let rule = &logger.rules()[0];
        assert_eq!(rule.min_level, LogLevel::Info);
        assert_eq!(rule.max_level, LogLevel::Error);
    }

    #[test]
    fn test_remove_target() {
        let mut logger = Logger::new("L", "x", LogLevel::Info, LogLevel::Error);
        logger.register_target(Sink::console("c", "{message}"));

        let changes = logger.remove_target("c");
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], RoutingChange::RemoveRule(_)));
        assert!(matches!(&changes[1], RoutingChange::RemoveSink(n) if n == "c"));
        assert!(logger.sinks().is_empty());
        assert!(logger.rules().is_empty());

        assert!(logger.remove_target("c").is_empty());
    }

    #[test]
    fn test_protected_rules_match_everyone() {
        let mut master = Logger::new("Master", "master", LogLevel::Info, LogLevel::Fatal).protected();
        master.register_target(Sink::console("c", "{message}"));
        assert!(master.rules()[0].accepts("Anyone_12345678", LogLevel::Warn));

        let mut plain = Logger::new("Plain", "x", LogLevel::Info, LogLevel::Fatal);
        plain.register_target(Sink::console("p", "{message}"));
        assert!(!plain.rules()[0].accepts("Anyone_12345678", LogLevel::Warn));
        assert!(plain.rules()[0].accepts(&plain.name, LogLevel::Warn));
    }
}
