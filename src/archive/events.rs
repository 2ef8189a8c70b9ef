//! Archive progress events
//!
//! Progress is reported through a bounded channel. The archiver never blocks
//! on a slow consumer: when the channel is full the event is dropped. Failures
//! are also kept as [`FailedFile`] records on the archiver, so a dropped
//! `FileFailed` event loses nothing.

use std::time::Duration;

use tokio::sync::mpsc;

/// Default number of buffered events
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Progress of an archive run
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveEvent {
    /// A source file was added to a container
    FileAdded {
        container_name: String,
        file_name: String,
        files_remaining: usize,
        percent_done: f64,
    },
    /// A container was closed
    ArchiveCompleted {
        container_name: String,
        byte_size: u64,
        elapsed: Duration,
    },
    /// A source file could not be added or removed
    FileFailed {
        container_name: String,
        file_name: String,
        error: String,
    },
}

/// A source file that could not be added to or removed after its container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub container_name: String,
    pub file_name: String,
    pub error: String,
}

impl From<FailedFile> for ArchiveEvent {
    fn from(failed: FailedFile) -> Self {
        ArchiveEvent::FileFailed {
            container_name: failed.container_name,
            file_name: failed.file_name,
            error: failed.error,
        }
    }
}

/// Sender half of the archive event channel
pub type ArchiveEventSender = mpsc::Sender<ArchiveEvent>;

/// Receiver half of the archive event channel
pub type ArchiveEventReceiver = mpsc::Receiver<ArchiveEvent>;

/// Create a bounded channel for archive events
pub fn create_channel(buffer: usize) -> (ArchiveEventSender, ArchiveEventReceiver) {
    mpsc::channel(buffer.max(1))
}

/// Deliver an event without blocking
///
/// Progress events may be dropped here; callers that need failures must also
/// record them elsewhere.
pub(crate) fn emit(sender: Option<&ArchiveEventSender>, event: ArchiveEvent) {
    let Some(sender) = sender else {
        return;
    };
    match sender.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!("Archive event channel full, dropping event");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!("Archive event channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(name: &str) -> ArchiveEvent {
        ArchiveEvent::FileFailed {
            container_name: "c.zip".to_string(),
            file_name: name.to_string(),
            error: "boom".to_string(),
        }
    }

    #[test]
    fn test_emit_delivers_in_order() {
        let (tx, mut rx) = create_channel(4);
        emit(Some(&tx), failed("a"));
        emit(Some(&tx), failed("b"));

        assert_eq!(rx.try_recv().unwrap(), failed("a"));
        assert_eq!(rx.try_recv().unwrap(), failed("b"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_emit_drops_when_full() {
        let (tx, mut rx) = create_channel(1);
        emit(Some(&tx), failed("kept"));
        emit(Some(&tx), failed("dropped"));

        assert_eq!(rx.try_recv().unwrap(), failed("kept"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_emit_without_sender_or_receiver() {
        emit(None, failed("nobody"));

        let (tx, rx) = create_channel(1);
        drop(rx);
        emit(Some(&tx), failed("closed"));
    }
}
