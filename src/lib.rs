//! logbroker - session-scoped log routing with rotation archiving
//!
//! Loggers publish sinks and routing rules into a shared configuration owned by
//! a [`LogBroker`](session::LogBroker); rotated log files are grouped into
//! compressed containers and pruned by the [`archive`] module.

pub mod archive;
pub mod config;
pub mod level;
pub mod logging;
pub mod pattern;
pub mod registry;
pub mod session;
pub mod stamp;
