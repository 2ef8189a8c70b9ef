//! Log broker
//!
//! The context object tying a session to its logger registry. Applications
//! create one broker at the top level and hand it to the components that log.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::{Context, Result};
use chrono::Local;

use crate::archive::{ArchiveConfig, LogArchiver};
use crate::config;
use crate::level::LogLevel;
use crate::registry::{Logger, LoggerHandle, LoggerRegistry, Sink, SinkKind};

use super::{Session, SessionConfig};

/// Category of the master logger
pub const MASTER_CATEGORY: &str = "master";

/// Session state plus the shared logger registry
#[derive(Debug)]
pub struct LogBroker {
    registry: Arc<LoggerRegistry>,
    session: RwLock<Option<Arc<Session>>>,
    master: Mutex<Option<Arc<LoggerHandle>>>,
    default_dir: PathBuf,
}

impl Default for LogBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBroker {
    /// Create a broker whose sessions default to the standard logs directory
    pub fn new() -> Self {
        Self::with_log_dir(config::logs_dir())
    }

    /// Create a broker with a custom default log directory
    pub fn with_log_dir(default_dir: PathBuf) -> Self {
        Self {
            registry: Arc::new(LoggerRegistry::new()),
            session: RwLock::new(None),
            master: Mutex::new(None),
            default_dir,
        }
    }

    /// The logger registry
    pub fn registry(&self) -> &Arc<LoggerRegistry> {
        &self.registry
    }

    /// Initialize (or re-initialize) the session
    ///
    /// Resolves and creates the log directory, retracts the previous master
    /// logger's sinks and opens a new protected master logger with a file sink
    /// and, if configured, a console sink. Returns true when the session is
    /// enabled and the master logger is registered.
    ///
    /// Must not run concurrently with archiving of the same directory.
    pub fn initialize(&self, config: &SessionConfig) -> Result<bool> {
        let session = Session::resolve(config, &self.default_dir, Local::now())?;
        std::fs::create_dir_all(&session.log_dir).with_context(|| {
            format!(
                "Failed to create log directory {}",
                session.log_dir.display()
            )
        })?;
        let session = Arc::new(session);

        // Retire the previous master before its replacement publishes sinks
        let previous = self.lock_master().take();
        if let Some(previous) = previous {
            previous.release();
        }

        self.store_session(Some(Arc::clone(&session)));

        if !session.enabled {
            tracing::info!(session = %session.name, "Logging disabled for session");
            return Ok(false);
        }

        let master = self.open_master(&session);
        let ready = self.registry.contains(master.id());
        *self.lock_master() = Some(Arc::new(master));

        tracing::info!(
            session = %session.name,
            log_file = %session.log_file.display(),
            min_level = %session.min_level,
            max_level = %session.max_level,
            "Session initialized"
        );
        Ok(ready)
    }

    fn open_master(&self, session: &Session) -> LoggerHandle {
        let mut master = Logger::new(
            &session.name,
            MASTER_CATEGORY,
            session.min_level,
            session.max_level,
        )
        .protected();

        if session.console {
            master.register_target(Sink::console(
                format!("{}_console", session.name),
                session.console_template.clone(),
            ));
        }
        master.register_target(Sink::new(
            format!("{}_file", session.name),
            SinkKind::File {
                path: session.log_file.clone(),
                max_bytes: session.max_file_bytes,
            },
            session.file_template.clone(),
        ));

        self.registry.open(master)
    }

    fn lock_master(&self) -> std::sync::MutexGuard<'_, Option<Arc<LoggerHandle>>> {
        self.master
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store_session(&self, session: Option<Arc<Session>>) {
        let mut guard = self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = session;
    }

    /// Snapshot of the active session
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Session name, if initialized
    pub fn name(&self) -> Option<String> {
        self.session().map(|s| s.name.clone())
    }

    /// Log file path, if initialized
    pub fn log_file(&self) -> Option<PathBuf> {
        self.session().map(|s| s.log_file.clone())
    }

    /// Log directory, if initialized
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.session().map(|s| s.log_dir.clone())
    }

    /// Session minimum level (`Off` when uninitialized)
    pub fn min_level(&self) -> LogLevel {
        self.session().map_or(LogLevel::Off, |s| s.min_level)
    }

    /// Session maximum level (`Off` when uninitialized)
    pub fn max_level(&self) -> LogLevel {
        self.session().map_or(LogLevel::Off, |s| s.max_level)
    }

    /// Whether an enabled session is active
    pub fn is_enabled(&self) -> bool {
        self.session().is_some_and(|s| s.enabled)
    }

    /// Handle of the current master logger
    pub fn master(&self) -> Option<Arc<LoggerHandle>> {
        self.lock_master().clone()
    }

    /// File the master logger is currently writing
    ///
    /// Differs from the session's log file once the file has rolled over.
    pub fn active_log_file(&self) -> Option<PathBuf> {
        let session = self.session()?;
        self.registry
            .shared()
            .current_file(&format!("{}_file", session.name))
            .or_else(|| Some(session.log_file.clone()))
    }

    /// Open a logger using the session's full window
    pub fn logger(&self, name: &str, category: &str) -> Result<LoggerHandle> {
        let (min, max) = {
            let session = self.require_session()?;
            (session.min_level, session.max_level)
        };
        self.logger_with_levels(name, category, min, max)
    }

    /// Open a logger with its own window, clamped to the session's
    pub fn logger_with_levels(
        &self,
        name: &str,
        category: &str,
        min: LogLevel,
        max: LogLevel,
    ) -> Result<LoggerHandle> {
        let session = self.require_session()?;
        let (min, max) = session.clamp_window(min, max);
        Ok(self.registry.open(Logger::new(name, category, min, max)))
    }

    /// Write through the master logger; used by the tracing bridge
    pub fn master_log(&self, level: LogLevel, target: &str, message: &str) -> usize {
        let Some(master) = self.master() else {
            return 0;
        };
        if target.is_empty() {
            master.log(level, message)
        } else {
            let properties = [("target".to_string(), target.to_string())];
            master.log_with(level, &properties, message)
        }
    }

    /// Build an archiver for the session's log directory
    ///
    /// Blank search paths default to the log directory and the active log file
    /// is never archived.
    pub fn archiver(&self, mut archive: ArchiveConfig) -> Result<LogArchiver> {
        let session = self.require_session()?;
        if archive.search_path.as_os_str().is_empty() {
            archive.search_path = session.log_dir.clone();
        }
        let mut archiver = LogArchiver::new(archive, session.name.clone());
        if let Some(active) = self.active_log_file() {
            archiver = archiver.exclude(active);
        }
        Ok(archiver)
    }

    fn require_session(&self) -> Result<Arc<Session>> {
        self.session()
            .context("Log session has not been initialized")
    }

    /// Retract the master logger and forget the session
    pub fn shutdown(&self) {
        let previous = self.lock_master().take();
        if let Some(previous) = previous {
            previous.release();
        }
        self.store_session(None);
    }
}
