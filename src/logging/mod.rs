//! Logging support
//!
//! The in-memory buffer behind memory sinks, and the bridge that routes the
//! crate's own `tracing` diagnostics through the broker's master logger.

mod bridge;
mod buffer;

pub use bridge::{init_tracing, BridgeMaker};
pub use buffer::{LogBuffer, LogEntry};
