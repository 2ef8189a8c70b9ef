//! Shared sink configuration
//!
//! The single output configuration every logger writes through. Rules and
//! targets sit behind separate locks; code that needs both always takes the
//! rules lock first.
//!
//! Nothing in this module emits `tracing` events: the tracing bridge writes
//! back into this configuration, and the locks are not re-entrant.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;

use crate::logging::{LogBuffer, LogEntry};
use crate::stamp;

use super::{render_template, LogRecord, RoutingChange, RoutingRule, Sink, SinkKind};

/// An opened file destination
#[derive(Debug)]
struct FileOutput {
    path: PathBuf,
    file: File,
    written: u64,
}

/// A sink plus its lazily opened output
#[derive(Debug)]
struct ActiveSink {
    sink: Sink,
    file: Option<FileOutput>,
}

impl ActiveSink {
    fn new(sink: Sink) -> Self {
        Self { sink, file: None }
    }

    fn write(&mut self, record: &LogRecord<'_>) -> std::io::Result<()> {
        let line = render_template(&self.sink.template, record);
        match &self.sink.kind {
            SinkKind::Console => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{}", line)
            }
            SinkKind::Memory(buffer) => {
                push_memory(buffer, record, line);
                Ok(())
            }
            SinkKind::File { path, max_bytes } => {
                let path = path.clone();
                let max_bytes = *max_bytes;
                self.write_file(&path, max_bytes, &line)
            }
        }
    }

    fn write_file(&mut self, path: &Path, max_bytes: Option<u64>, line: &str) -> std::io::Result<()> {
        let len = line.len() as u64 + 1;

        let needs_rollover = match (&self.file, max_bytes) {
            (Some(output), Some(max)) => output.written > 0 && output.written + len > max,
            _ => false,
        };
        if needs_rollover {
            let current = self
                .file
                .take()
                .map(|o| o.path)
                .unwrap_or_else(|| path.to_path_buf());
            self.file = Some(open_file(&next_rollover_path(&current))?);
        }

        if self.file.is_none() {
            self.file = Some(open_file(path)?);
        }

        match self.file.as_mut() {
            Some(output) => {
                writeln!(output.file, "{}", line)?;
                output.file.flush()?;
                output.written += len;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Path currently written by a file sink
    fn current_path(&self) -> Option<PathBuf> {
        match (&self.file, &self.sink.kind) {
            (Some(output), _) => Some(output.path.clone()),
            (None, SinkKind::File { path, .. }) => Some(path.clone()),
            _ => None,
        }
    }
}

fn push_memory(buffer: &Arc<LogBuffer>, record: &LogRecord<'_>, line: String) {
    buffer.push(LogEntry::new(
        record.level,
        record.logger,
        record.message,
        line,
    ));
}

fn open_file(path: &Path) -> std::io::Result<FileOutput> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let written = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok(FileOutput {
        path: path.to_path_buf(),
        file,
        written,
    })
}

/// Path of the file that follows `current` once it is full
///
/// Keeps the stem prefix, swaps in a fresh timestamp token and adds a counter
/// when that name is already taken.
pub(crate) fn next_rollover_path(current: &Path) -> PathBuf {
    let dir = current.parent().unwrap_or_else(|| Path::new(""));
    let stem = current
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = current
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    let prefix = stamp::strip_token(&stem).to_string();
    let token = stamp::format_token(&Local::now());

    let mut candidate = dir.join(format!("{}_{}.{}", prefix, token, ext));
    let mut counter = 1;
    while candidate.exists() || candidate == current {
        candidate = dir.join(format!("{}_{}_{}.{}", prefix, token, counter, ext));
        counter += 1;
    }
    candidate
}

/// The shared set of sinks and routing rules
#[derive(Debug, Default)]
pub struct SinkConfiguration {
    rules: Mutex<Vec<RoutingRule>>,
    targets: Mutex<Vec<ActiveSink>>,
    write_failures: AtomicU64,
}

impl SinkConfiguration {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_rules(&self) -> MutexGuard<'_, Vec<RoutingRule>> {
        self.rules.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_targets(&self) -> MutexGuard<'_, Vec<ActiveSink>> {
        self.targets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a sink unless one with the same name exists
    ///
    /// Returns true if the sink was added.
    pub fn add_sink(&self, sink: Sink) -> bool {
        let mut targets = self.lock_targets();
        insert_sink(&mut targets, sink)
    }

    /// Remove a sink by name, returning true if it was present
    pub fn remove_sink(&self, name: &str) -> bool {
        let mut targets = self.lock_targets();
        remove_sink(&mut targets, name)
    }

    /// Add a rule unless one with the same name exists
    pub fn add_rule(&self, rule: RoutingRule) -> bool {
        let mut rules = self.lock_rules();
        insert_rule(&mut rules, rule)
    }

    /// Remove a rule by name, returning true if it was present
    pub fn remove_rule(&self, name: &str) -> bool {
        let mut rules = self.lock_rules();
        remove_rule(&mut rules, name)
    }

    /// Look up a sink by name
    pub fn find_sink(&self, name: &str) -> Option<Sink> {
        self.lock_targets()
            .iter()
            .find(|t| t.sink.name == name)
            .map(|t| t.sink.clone())
    }

    /// Look up a rule by name
    pub fn find_rule(&self, name: &str) -> Option<RoutingRule> {
        self.lock_rules().iter().find(|r| r.name == name).cloned()
    }

    /// Names of all sinks, in insertion order
    pub fn sink_names(&self) -> Vec<String> {
        self.lock_targets()
            .iter()
            .map(|t| t.sink.name.clone())
            .collect()
    }

    /// Names of all rules, in insertion order
    pub fn rule_names(&self) -> Vec<String> {
        self.lock_rules().iter().map(|r| r.name.clone()).collect()
    }

    /// Number of sinks
    pub fn sink_count(&self) -> usize {
        self.lock_targets().len()
    }

    /// Number of rules
    pub fn rule_count(&self) -> usize {
        self.lock_rules().len()
    }

    /// File currently written by the named file sink
    pub fn current_file(&self, sink_name: &str) -> Option<PathBuf> {
        self.lock_targets()
            .iter()
            .find(|t| t.sink.name == sink_name)
            .and_then(|t| t.current_path())
    }

    /// Number of writes that failed with an I/O error
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Apply a batch of changes: add-if-absent, remove-if-present
    ///
    /// Holds both locks for the whole batch. Returns the number of changes that
    /// modified the configuration.
    pub fn apply(&self, changes: &[RoutingChange]) -> usize {
        if changes.is_empty() {
            return 0;
        }

        let mut rules = self.lock_rules();
        let mut targets = self.lock_targets();

        let mut applied = 0;
        for change in changes {
            let changed = match change {
                RoutingChange::AddSink(sink) => insert_sink(&mut targets, sink.clone()),
                RoutingChange::RemoveSink(name) => remove_sink(&mut targets, name),
                RoutingChange::AddRule(rule) => insert_rule(&mut rules, rule.clone()),
                RoutingChange::RemoveRule(name) => remove_rule(&mut rules, name),
            };
            if changed {
                applied += 1;
            }
        }
        applied
    }

    /// Route a record to every sink with a matching rule
    ///
    /// Each sink receives the record at most once. Returns the number of sinks
    /// written successfully.
    pub fn write(&self, record: &LogRecord<'_>) -> usize {
        let mut sink_names: Vec<String> = Vec::new();
        {
            let rules = self.lock_rules();
            for rule in rules.iter().filter(|r| r.accepts(record.logger, record.level)) {
                if !sink_names.contains(&rule.sink) {
                    sink_names.push(rule.sink.clone());
                }
            }
        }
        if sink_names.is_empty() {
            return 0;
        }

        let mut targets = self.lock_targets();
        let mut written = 0;
        for name in &sink_names {
            if let Some(target) = targets.iter_mut().find(|t| &t.sink.name == name) {
                match target.write(record) {
                    Ok(()) => written += 1,
                    Err(_) => {
                        self.write_failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
        written
    }
}

fn insert_sink(targets: &mut Vec<ActiveSink>, sink: Sink) -> bool {
    if targets.iter().any(|t| t.sink.name == sink.name) {
        return false;
    }
    targets.push(ActiveSink::new(sink));
    true
}

fn remove_sink(targets: &mut Vec<ActiveSink>, name: &str) -> bool {
    let before = targets.len();
    targets.retain(|t| t.sink.name != name);
    targets.len() != before
}

fn insert_rule(rules: &mut Vec<RoutingRule>, rule: RoutingRule) -> bool {
    if rules.iter().any(|r| r.name == rule.name) {
        return false;
    }
    rules.push(rule);
    true
}

fn remove_rule(rules: &mut Vec<RoutingRule>, name: &str) -> bool {
    let before = rules.len();
    rules.retain(|r| r.name != name);
    rules.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LogLevel;
    use crate::pattern::Wildcard;
    use tempfile::TempDir;

    fn rule(name: &str, pattern: &str, sink: &str) -> RoutingRule {
        RoutingRule {
            name: name.to_string(),
            logger_pattern: Wildcard::new(pattern),
            min_level: LogLevel::Info,
            max_level: LogLevel::Fatal,
            sink: sink.to_string(),
        }
    }

    #[test]
    fn test_add_sink_is_idempotent_by_name() {
        let config = SinkConfiguration::new();
        let buffer = Arc::new(LogBuffer::new(10));

        assert!(config.add_sink(Sink::memory("mem", Arc::clone(&buffer), "{message}")));
        assert!(!config.add_sink(Sink::console("mem", "{message}")));
        assert_eq!(config.sink_count(), 1);
        assert!(matches!(
            config.find_sink("mem").unwrap().kind,
            SinkKind::Memory(_)
        ));
    }

    #[test]
    fn test_apply_adds_and_removes() {
        let config = SinkConfiguration::new();
        let changes = vec![
            RoutingChange::AddSink(Sink::console("c", "{message}")),
            RoutingChange::AddRule(rule("r", "*", "c")),
            RoutingChange::AddRule(rule("r", "*", "c")),
        ];
        assert_eq!(config.apply(&changes), 2);
        assert_eq!(config.rule_names(), vec!["r".to_string()]);

        let removals = vec![
            RoutingChange::RemoveRule("r".to_string()),
            RoutingChange::RemoveSink("c".to_string()),
            RoutingChange::RemoveSink("missing".to_string()),
        ];
        assert_eq!(config.apply(&removals), 2);
        assert_eq!(config.sink_count(), 0);
        assert_eq!(config.rule_count(), 0);
    }

    #[test]
    fn test_write_routes_once_per_sink() {
        let config = SinkConfiguration::new();
        let buffer = Arc::new(LogBuffer::new(10));
        config.add_sink(Sink::memory("mem", Arc::clone(&buffer), "{logger}|{message}"));
        config.add_rule(rule("all", "*", "mem"));
        config.add_rule(rule("own", "Worker_*", "mem"));

        let record = LogRecord::new(LogLevel::Info, "Worker_1", "hello", &[]);
        assert_eq!(config.write(&record), 1);

        let debug = LogRecord::new(LogLevel::Debug, "Worker_1", "quiet", &[]);
        assert_eq!(config.write(&debug), 0);

        let entries = buffer.all_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rendered, "Worker_1|hello");
    }

    #[test]
    fn test_file_sink_rolls_over() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Broker_Logging_01022026-101500.log");

        let config = SinkConfiguration::new();
        config.add_sink(Sink::new(
            "file",
            SinkKind::File {
                path: path.clone(),
                max_bytes: Some(16),
            },
            "{message}",
        ));
        config.add_rule(rule("all", "*", "file"));

        let first = LogRecord::new(LogLevel::Info, "L", "0123456789", &[]);
        let second = LogRecord::new(LogLevel::Info, "L", "abcdefghij", &[]);
        config.write(&first);
        config.write(&second);

        let current = config.current_file("file").unwrap();
        assert_ne!(current, path);
        assert!(current
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Broker_Logging_"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "0123456789\n");
        assert_eq!(fs::read_to_string(&current).unwrap(), "abcdefghij\n");
    }
}
