//! Severity levels
//!
//! Ordinal severity scale used by sessions, loggers and routing rules, with
//! conversions to and from `tracing::Level`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity of a log record, ordered from most to least verbose
///
/// `Off` is a sentinel: a window of `Off..=Off` disables logging.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

impl LogLevel {
    /// All levels in ordinal order
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
        LogLevel::Off,
    ];

    /// Ordinal position on the severity scale (0 = Trace, 6 = Off)
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Convert an ordinal back into a level
    ///
    /// Out-of-range ordinals yield `fallback`, which callers pass as the
    /// session's configured minimum.
    pub fn from_ordinal(ordinal: i64, fallback: LogLevel) -> LogLevel {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or(fallback)
    }

    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
            LogLevel::Off => "OFF",
        }
    }

    /// Map to the `tracing` level; `Off` has no counterpart
    pub fn to_tracing(self) -> Option<tracing::Level> {
        match self {
            LogLevel::Trace => Some(tracing::Level::TRACE),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Error | LogLevel::Fatal => Some(tracing::Level::ERROR),
            LogLevel::Off => None,
        }
    }

    /// Clamp this level into the inclusive window `min..=max`
    pub fn clamp_to(self, min: LogLevel, max: LogLevel) -> LogLevel {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }

    /// Check whether this level falls inside `min..=max`
    pub fn within(self, min: LogLevel, max: LogLevel) -> bool {
        self != LogLevel::Off && min <= self && self <= max
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" | "critical" => Ok(LogLevel::Fatal),
            "off" | "none" => Ok(LogLevel::Off),
            other => anyhow::bail!("Unknown log level '{}'", other),
        }
    }
}
