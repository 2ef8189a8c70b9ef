//! Session state
//!
//! A session describes where and how a process logs: its name, the active log
//! file, the severity window and the default format templates. It is resolved
//! from a [`SessionConfig`] by [`LogBroker::initialize`].

pub mod broker;

pub use broker::LogBroker;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::level::LogLevel;
use crate::stamp;

/// Default template for console sinks
pub const DEFAULT_CONSOLE_TEMPLATE: &str = "{time} {level} {logger}: {message}";

/// Default template for file sinks
pub const DEFAULT_FILE_TEMPLATE: &str = "{timestamp} | {level} | {logger} | {message}";

/// Session settings as supplied by the caller or the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Human-readable session (broker) name, used in file names
    #[serde(default = "default_session_name")]
    pub name: String,

    /// Directory, bare file name, or full path of the log file
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// File name to use inside `file_path` (a timestamp token is appended)
    #[serde(default)]
    pub file_name: Option<String>,

    /// Lowest level written
    #[serde(default = "default_min_level")]
    pub min_level: LogLevel,

    /// Highest level written
    #[serde(default = "default_max_level")]
    pub max_level: LogLevel,

    /// Whether the master logger also writes to the console
    #[serde(default = "default_console")]
    pub console: bool,

    /// Roll the log file over to a new timestamped file past this size
    #[serde(default)]
    pub max_file_bytes: Option<u64>,

    /// Console line template
    #[serde(default = "default_console_template")]
    pub console_template: String,

    /// File line template
    #[serde(default = "default_file_template")]
    pub file_template: String,
}

fn default_session_name() -> String {
    "LogBroker".to_string()
}

fn default_min_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_level() -> LogLevel {
    LogLevel::Fatal
}

fn default_console() -> bool {
    true
}

fn default_console_template() -> String {
    DEFAULT_CONSOLE_TEMPLATE.to_string()
}

fn default_file_template() -> String {
    DEFAULT_FILE_TEMPLATE.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_session_name(),
            file_path: None,
            file_name: None,
            min_level: default_min_level(),
            max_level: default_max_level(),
            console: default_console(),
            max_file_bytes: None,
            console_template: default_console_template(),
            file_template: default_file_template(),
        }
    }
}

impl SessionConfig {
    /// Create a config with the given session name and default everything else
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// The resolved, active session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Session (broker) name
    pub name: String,
    /// Full path of the log file
    pub log_file: PathBuf,
    /// Directory containing the log file
    pub log_dir: PathBuf,
    /// Lowest level written
    pub min_level: LogLevel,
    /// Highest level written
    pub max_level: LogLevel,
    /// False when the window is `Off..=Off`
    pub enabled: bool,
    /// Whether the master logger writes to the console
    pub console: bool,
    /// Roll-over size for the log file
    pub max_file_bytes: Option<u64>,
    /// Console line template
    pub console_template: String,
    /// File line template
    pub file_template: String,
    /// When the session was initialized
    pub started_at: DateTime<Local>,
}

impl Session {
    /// Resolve a config into a session
    ///
    /// Does not touch the filesystem beyond inspecting `file_path`.
    pub fn resolve(config: &SessionConfig, default_dir: &Path, now: DateTime<Local>) -> Result<Self> {
        let name = config.name.trim();
        if name.is_empty() {
            bail!("Session name must not be empty");
        }
        if config.min_level > config.max_level {
            bail!(
                "Minimum level {} is above maximum level {}",
                config.min_level,
                config.max_level
            );
        }

        let log_file = resolve_log_path(
            config.file_path.as_deref(),
            config.file_name.as_deref(),
            name,
            default_dir,
            &now,
        )?;
        let log_dir = log_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_dir.to_path_buf());

        let enabled = !(config.min_level == LogLevel::Off && config.max_level == LogLevel::Off);

        Ok(Self {
            name: name.to_string(),
            log_file,
            log_dir,
            min_level: config.min_level,
            max_level: config.max_level,
            enabled,
            console: config.console,
            max_file_bytes: config.max_file_bytes,
            console_template: config.console_template.clone(),
            file_template: config.file_template.clone(),
            started_at: now,
        })
    }

    /// Clamp a logger window into the session window
    pub fn clamp_window(&self, min: LogLevel, max: LogLevel) -> (LogLevel, LogLevel) {
        let min = min.clamp_to(self.min_level, self.max_level);
        let max = max.clamp_to(min, self.max_level);
        (min, max)
    }

    /// Log file name
    pub fn file_name(&self) -> String {
        self.log_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Default log file name, `{session}_Logging_{MMddyyyy-HHmmss}.log`
pub fn default_log_file_name(session_name: &str, now: &DateTime<Local>) -> String {
    format!("{}_Logging_{}.log", session_name, stamp::format_token(now))
}

/// Work out the log file path from the user-supplied pieces
///
/// `file_path` may be a directory, a bare file name or a full path. A file name
/// without a timestamp token gets one appended, so rotated files sort and
/// archive by name.
pub fn resolve_log_path(
    file_path: Option<&Path>,
    file_name: Option<&str>,
    session_name: &str,
    default_dir: &Path,
    now: &DateTime<Local>,
) -> Result<PathBuf> {
    let token = stamp::format_token(now);
    let file_name = file_name.map(str::trim).filter(|n| !n.is_empty());
    let named = |name: Option<&str>| match name {
        Some(name) => stamp::with_token(name, &token),
        None => default_log_file_name(session_name, now),
    };

    let Some(raw) = file_path.filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(default_dir.join(named(file_name)));
    };
    let path = expand_home(raw);

    let raw_str = raw.to_string_lossy();
    let looks_like_dir = path.is_dir()
        || raw_str.ends_with('/')
        || raw_str.ends_with(std::path::MAIN_SEPARATOR)
        || path.extension().is_none();

    if looks_like_dir {
        if path.is_file() {
            bail!(
                "Log path {} is an existing file, not a directory",
                path.display()
            );
        }
        return Ok(path.join(named(file_name)));
    }

    if file_name.is_some() {
        bail!(
            "Log path {} already names a file; a separate file name cannot be combined with it",
            path.display()
        );
    }

    let given_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => default_dir.to_path_buf(),
    };
    Ok(dir.join(named(Some(&given_name))))
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_home(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
