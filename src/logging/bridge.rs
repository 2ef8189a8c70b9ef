//! Tracing bridge
//!
//! Installs a `tracing` subscriber whose formatted lines are handed to the
//! broker's master logger, so diagnostics land in the session's sinks.

use std::cell::Cell;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::level::LogLevel;
use crate::session::LogBroker;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "logbroker=info";

thread_local! {
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

/// Writer forwarding each formatted line to the master logger
pub struct BridgeWriter {
    broker: Arc<LogBroker>,
}

impl Write for BridgeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // Diagnostics raised while forwarding are dropped
        if FORWARDING.with(|f| f.replace(true)) {
            return Ok(buf.len());
        }

        let text = String::from_utf8_lossy(buf);
        for line in text.lines() {
            if let Some((level, target, message)) = parse_log_line(line) {
                self.broker.master_log(level, target, message);
            }
        }

        FORWARDING.with(|f| f.set(false));
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writer factory for tracing-subscriber
pub struct BridgeMaker {
    broker: Arc<LogBroker>,
}

impl BridgeMaker {
    pub fn new(broker: Arc<LogBroker>) -> Self {
        Self { broker }
    }
}

impl<'a> MakeWriter<'a> for BridgeMaker {
    type Writer = BridgeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BridgeWriter {
            broker: Arc::clone(&self.broker),
        }
    }
}

/// Split a formatted line into level, target and message
///
/// Expects the fmt layer's output without timestamps:
/// `" INFO logbroker::archive: message key=value"`.
fn parse_log_line(line: &str) -> Option<(LogLevel, &str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (level, rest) = match line.split_once(' ') {
        Some((word, rest)) => match word.parse::<LogLevel>() {
            Ok(level) => (level, rest.trim_start()),
            Err(_) => (LogLevel::Info, line),
        },
        None => (LogLevel::Info, line),
    };

    // Span context and targets never contain spaces before the colon
    match rest.split_once(": ") {
        Some((target, message)) if !target.contains(' ') => Some((level, target, message)),
        _ => Some((level, "", rest)),
    }
}

/// Install the global subscriber forwarding to `broker`
///
/// Filtering follows `RUST_LOG`, defaulting to [`DEFAULT_FILTER`].
pub fn init_tracing(broker: Arc<LogBroker>) -> Result<()> {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(BridgeMaker::new(broker))
        .with_ansi(false)
        .with_target(true)
        .without_time();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogBuffer;
    use crate::registry::Sink;
    use crate::session::SessionConfig;
    use tempfile::TempDir;

    #[test]
    fn test_parse_log_line_info() {
        let (level, target, message) =
            parse_log_line(" INFO logbroker: Starting broker").unwrap();
        assert_eq!(level, LogLevel::Info);
        assert_eq!(target, "logbroker");
        assert_eq!(message, "Starting broker");
    }

    #[test]
    fn test_parse_log_line_warn() {
        let (level, target, message) =
            parse_log_line(" WARN logbroker::archive::set: No timestamp token file=a.log").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(target, "logbroker::archive::set");
        assert_eq!(message, "No timestamp token file=a.log");
    }

    #[test]
    fn test_parse_log_line_without_target() {
        let (level, target, message) = parse_log_line("ERROR plain failure text").unwrap();
        assert_eq!(level, LogLevel::Error);
        assert_eq!(target, "");
        assert_eq!(message, "plain failure text");
        assert!(parse_log_line("   ").is_none());
    }

    #[test]
    fn test_writer_forwards_to_master() {
        let temp_dir = TempDir::new().unwrap();
        let broker = Arc::new(LogBroker::with_log_dir(temp_dir.path().to_path_buf()));
        let mut config = SessionConfig::named("Bridge");
        config.console = false;
        assert!(broker.initialize(&config).unwrap());

        let buffer = Arc::new(LogBuffer::new(10));
        let master = broker.master().unwrap();
        master.register_target(Sink::memory("bridge_mem", Arc::clone(&buffer), "{message}"));

        let maker = BridgeMaker::new(Arc::clone(&broker));
        let mut writer = maker.make_writer();
        writer
            .write_all(b" WARN logbroker::archive: disk nearly full\n")
            .unwrap();

        let entries = buffer.all_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert_eq!(entries[0].message, "disk nearly full");
    }
}
