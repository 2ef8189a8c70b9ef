//! Archive errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the archive engine
///
/// Per-file failures while archiving or pruning are not raised; they are
/// reported through events and the boolean result instead.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An archive or cleanup operation was called before `initialize`
    #[error("archiver has not been initialized")]
    NotInitialized,

    /// The directory to scan does not exist
    #[error("search path {0} does not exist")]
    SearchPathMissing(PathBuf),

    /// Filesystem failure on a specific path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure inside the zip writer
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}
