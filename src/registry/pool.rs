//! Logger pool
//!
//! Central registry of live loggers. Registration publishes a logger's sinks
//! and rules into the shared configuration; destruction retracts whatever no
//! other live logger still owns.
//!
//! Lock order is pool, then rules, then targets. No `tracing` event is emitted
//! while the pool lock is held.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::pattern::Wildcard;

use super::{Logger, LoggerHandle, LoggerId, LoggerInfo, RoutingChange, SinkConfiguration};

/// Thread-safe pool of logger instances sharing one sink configuration
#[derive(Debug, Default)]
pub struct LoggerRegistry {
    pool: Mutex<Vec<Logger>>,
    shared: Arc<SinkConfiguration>,
}

impl LoggerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared sink configuration
    pub fn shared(&self) -> &Arc<SinkConfiguration> {
        &self.shared
    }

    fn lock_pool(&self) -> MutexGuard<'_, Vec<Logger>> {
        self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a logger and publish its sinks and rules
    ///
    /// An entry with the same id or the same name is replaced in place. Sinks
    /// and rules of the replaced entry that nobody owns any more are retracted.
    /// Returns true iff the logger is in the pool afterwards.
    pub fn register(&self, logger: Logger) -> bool {
        let id = logger.id;
        let name = logger.name.clone();
        let publish = logger.publish_changes();

        let (present, replaced) = {
            let mut pool = self.lock_pool();

            // Every stale entry under either key goes; the new one takes the first slot
            let mut replaced = Vec::new();
            let mut slot = None;
            let mut i = 0;
            while i < pool.len() {
                if pool[i].id == id || pool[i].name == name {
                    if slot.is_none() {
                        slot = Some(i);
                    }
                    replaced.push(pool.remove(i));
                } else {
                    i += 1;
                }
            }
            match slot {
                Some(index) => pool.insert(index, logger),
                None => pool.push(logger),
            }

            let mut changes = orphaned_changes(&pool, &replaced);
            changes.extend(publish);
            self.shared.apply(&changes);

            (pool.iter().any(|l| l.id == id), replaced.len())
        };

        tracing::debug!(
            logger = %name,
            logger_id = %id,
            replaced,
            "Registered logger"
        );
        present
    }

    /// Register a logger and return a handle that destroys it on release
    pub fn open(self: &Arc<Self>, logger: Logger) -> LoggerHandle {
        let handle = LoggerHandle::new(Arc::clone(self), &logger);
        self.register(logger);
        handle
    }

    /// Remove a logger by id, along with any entry sharing its name
    ///
    /// Sinks and rules still owned by another live logger (the protected
    /// master in particular) stay in the shared configuration. Returns true
    /// iff no entry with that id or name remains.
    pub fn destroy(&self, id: LoggerId) -> bool {
        let (gone, removed) = {
            let mut pool = self.lock_pool();
            let Some(name) = pool.iter().find(|l| l.id == id).map(|l| l.name.clone()) else {
                return true;
            };

            let mut removed = Vec::new();
            let mut i = 0;
            while i < pool.len() {
                if pool[i].id == id || pool[i].name == name {
                    removed.push(pool.remove(i));
                } else {
                    i += 1;
                }
            }

            let changes = orphaned_changes(&pool, &removed);
            self.shared.apply(&changes);

            let gone = !pool.iter().any(|l| l.id == id || l.name == name);
            (gone, removed)
        };

        for logger in &removed {
            tracing::debug!(logger = %logger.name, logger_id = %logger.id, "Destroyed logger");
        }
        gone
    }

    /// Mutate a pooled logger and mirror the resulting diff
    ///
    /// Returns `None` if the logger is not in the pool.
    pub fn update<F>(&self, id: LoggerId, mutate: F) -> Option<Vec<RoutingChange>>
    where
        F: FnOnce(&mut Logger) -> Vec<RoutingChange>,
    {
        let mut pool = self.lock_pool();
        let index = pool.iter().position(|l| l.id == id)?;
        let changes = mutate(&mut pool[index]);
        let filtered = filter_owned(&pool, changes);
        self.shared.apply(&filtered);
        Some(filtered)
    }

    /// Mirror a diff into the shared configuration
    ///
    /// Removals of names some live logger still owns are skipped. Returns the
    /// number of changes that modified the configuration.
    pub fn apply(&self, changes: Vec<RoutingChange>) -> usize {
        let pool = self.lock_pool();
        let filtered = filter_owned(&pool, changes);
        self.shared.apply(&filtered)
    }

    /// Snapshot of a pooled logger
    pub fn get(&self, id: LoggerId) -> Option<Logger> {
        self.lock_pool().iter().find(|l| l.id == id).cloned()
    }

    /// Check whether a logger is pooled
    pub fn contains(&self, id: LoggerId) -> bool {
        self.lock_pool().iter().any(|l| l.id == id)
    }

    /// Number of pooled loggers
    pub fn len(&self) -> usize {
        self.lock_pool().len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loggers matching a predicate
    pub fn find_loggers<P>(&self, predicate: P) -> Vec<LoggerInfo>
    where
        P: Fn(&LoggerInfo) -> bool,
    {
        self.lock_pool()
            .iter()
            .map(Logger::info)
            .filter(|info| predicate(info))
            .collect()
    }

    /// Loggers created for a given kind of component
    pub fn find_loggers_by_category(&self, category: &str) -> Vec<LoggerInfo> {
        self.find_loggers(|info| info.category == category)
    }

    /// Loggers whose display name matches a wildcard pattern
    pub fn find_loggers_by_name(&self, pattern: &str) -> Vec<LoggerInfo> {
        let pattern = Wildcard::new(pattern);
        self.find_loggers(|info| pattern.matches(&info.name))
    }
}

/// Retractions for the entries of `gone` that no logger in `pool` still owns
fn orphaned_changes(pool: &[Logger], gone: &[Logger]) -> Vec<RoutingChange> {
    let mut changes = Vec::new();
    for logger in gone {
        for change in logger.retract_changes() {
            if !pool.iter().any(|l| l.owns(change.name())) {
                changes.push(change);
            }
        }
    }
    changes
}

/// Drop removals that would take something away from a live logger
fn filter_owned(pool: &[Logger], changes: Vec<RoutingChange>) -> Vec<RoutingChange> {
    changes
        .into_iter()
        .filter(|change| match change {
            RoutingChange::RemoveSink(name) | RoutingChange::RemoveRule(name) => {
                !pool.iter().any(|l| l.owns(name))
            }
            RoutingChange::AddSink(_) | RoutingChange::AddRule(_) => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LogLevel;
    use crate::logging::LogBuffer;
    use crate::registry::Sink;

    fn logger_with_sink(name: &str, sink: &str) -> Logger {
        let mut logger = Logger::new(name, "test", LogLevel::Info, LogLevel::Fatal);
        logger.register_target(Sink::console(sink, "{message}"));
        logger
    }

    #[test]
    fn test_register_then_destroy_restores_shared_config() {
        let registry = LoggerRegistry::new();
        let master = logger_with_sink("Master", "master-console").protected();
        registry.register(master);

        let before_sinks = registry.shared().sink_names();
        let before_rules = registry.shared().rule_names();

        let logger = logger_with_sink("Worker", "worker-console");
        let id = logger.id;
        assert!(registry.register(logger));
        assert_eq!(registry.shared().sink_count(), 2);

        assert!(registry.destroy(id));
        assert_eq!(registry.shared().sink_names(), before_sinks);
        assert_eq!(registry.shared().rule_names(), before_rules);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_sink_names_collapse() {
        let registry = LoggerRegistry::new();
        let a = logger_with_sink("A", "shared-console");
        let b = logger_with_sink("B", "shared-console");
        let a_id = a.id;

        registry.register(a);
        registry.register(b);

        let names = registry.shared().sink_names();
        assert_eq!(
            names.iter().filter(|n| n.as_str() == "shared-console").count(),
            1
        );
        // Each logger keeps its own rule
        assert_eq!(registry.shared().rule_count(), 2);

        // B still owns the sink, so destroying A keeps it
        registry.destroy(a_id);
        assert!(registry.shared().find_sink("shared-console").is_some());
        assert_eq!(registry.shared().rule_count(), 1);
    }

    #[test]
    fn test_master_sinks_survive_other_teardown() {
        let registry = LoggerRegistry::new();
        let master = logger_with_sink("Master", "console").protected();
        let intruder = logger_with_sink("Intruder", "console");
        let intruder_id = intruder.id;

        registry.register(master);
        registry.register(intruder);
        registry.destroy(intruder_id);

        assert!(registry.shared().find_sink("console").is_some());
    }

    #[test]
    fn test_register_replaces_same_name_in_place() {
        let registry = LoggerRegistry::new();
        let original = logger_with_sink("Worker", "old-sink");
        let original_id = original.id;
        registry.register(original);

        let mut updated = registry.get(original_id).unwrap();
        updated.remove_target("old-sink");
        updated.register_target(Sink::console("new-sink", "{message}"));
        assert!(registry.register(updated));

        assert_eq!(registry.len(), 1);
        assert!(registry.shared().find_sink("old-sink").is_none());
        assert!(registry.shared().find_sink("new-sink").is_some());
    }

    #[test]
    fn test_register_replaces_entry_with_same_name_but_new_id() {
        let registry = LoggerRegistry::new();
        let first = logger_with_sink("Worker", "first");
        let first_id = first.id;
        registry.register(first);

        let mut second = registry.get(first_id).unwrap();
        second.id = uuid::Uuid::new_v4();
        let second_id = second.id;
        registry.register(second);

        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(first_id));
        assert!(registry.contains(second_id));
    }

    #[test]
    fn test_destroy_unknown_is_true() {
        let registry = LoggerRegistry::new();
        assert!(registry.destroy(uuid::Uuid::new_v4()));
    }

    #[test]
    fn test_update_mirrors_diff() {
        let registry = LoggerRegistry::new();
        let logger = Logger::new("Worker", "test", LogLevel::Info, LogLevel::Fatal);
        let id = logger.id;
        registry.register(logger);

        let buffer = Arc::new(LogBuffer::new(10));
        let changes = registry
            .update(id, |l| l.register_target(Sink::memory("mem", buffer, "{message}")))
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert!(registry.shared().find_sink("mem").is_some());

        registry.update(id, |l| l.remove_target("mem")).unwrap();
        assert!(registry.shared().find_sink("mem").is_none());
        assert_eq!(registry.shared().rule_count(), 0);
    }

    #[test]
    fn test_find_loggers() {
        let registry = LoggerRegistry::new();
        registry.register(Logger::new("Archiver", "archive", LogLevel::Info, LogLevel::Fatal));
        registry.register(Logger::new("Session", "session", LogLevel::Info, LogLevel::Fatal));
        registry.register(Logger::new("Session", "session", LogLevel::Info, LogLevel::Fatal));

        assert_eq!(registry.find_loggers_by_category("session").len(), 2);
        assert_eq!(registry.find_loggers_by_name("Archiver_*").len(), 1);
        assert_eq!(
            registry.find_loggers(|info| info.min_level == LogLevel::Info).len(),
            3
        );
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(LoggerRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let logger = logger_with_sink(&format!("T{}", i), "shared");
                        let id = logger.id;
                        registry.register(logger);
                        registry.destroy(id);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert!(registry.is_empty());
        assert_eq!(registry.shared().sink_count(), 0);
        assert_eq!(registry.shared().rule_count(), 0);
    }
}
