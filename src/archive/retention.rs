//! Archive retention
//!
//! Bounds the number of containers kept in the archive directory and the number
//! of log files kept in sibling log folders.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::pattern::Wildcard;

use super::set::{is_container_of, list_log_files};
use super::{ArchiveError, CompressionStyle};

/// What a cleanup pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    /// Files deleted
    pub deleted: usize,
    /// Files that could not be deleted
    pub failed: usize,
}

impl CleanupOutcome {
    /// True when nothing failed
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    fn remove(&mut self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => self.deleted += 1,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Failed to delete file");
                self.failed += 1;
            }
        }
    }
}

/// Keep the `keep` most recent containers of a session and delete the rest
///
/// Only names of the exact `{session}_{start}_{stop}[_{n}].{ext}` shape count,
/// ranked by modification time. Nothing happens while fewer than `keep`
/// containers exist.
pub fn cleanup_archive_history(
    archive_path: &Path,
    session_name: &str,
    style: CompressionStyle,
    keep: usize,
) -> Result<CleanupOutcome, ArchiveError> {
    let mut outcome = CleanupOutcome::default();
    if !archive_path.is_dir() {
        return Ok(outcome);
    }

    let mut containers: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(archive_path).map_err(|e| ArchiveError::io(archive_path, e))? {
        let entry = entry.map_err(|e| ArchiveError::io(archive_path, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_container_of(name, session_name, style) {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            if metadata.is_file() {
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                containers.push((modified, path));
            }
        }
    }

    if containers.len() < keep {
        return Ok(outcome);
    }

    // Newest first
    containers.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    for (_, path) in containers.iter().skip(keep) {
        outcome.remove(path);
    }

    if outcome.deleted > 0 {
        tracing::info!(
            deleted = outcome.deleted,
            kept = keep,
            "Pruned archive history"
        );
    }
    Ok(outcome)
}

/// Purge the oldest files from crowded log folders
///
/// Every immediate subdirectory of `log_root` other than `exclude_dir` holding
/// at least `trigger_count` matching files loses its `cleanup_count` oldest
/// files.
pub fn cleanup_log_folders(
    log_root: &Path,
    exclude_dir: &Path,
    filter: &Wildcard,
    trigger_count: usize,
    cleanup_count: usize,
) -> Result<CleanupOutcome, ArchiveError> {
    let mut outcome = CleanupOutcome::default();
    if !log_root.is_dir() {
        return Ok(outcome);
    }
    let exclude_dir = fs::canonicalize(exclude_dir).unwrap_or_else(|_| exclude_dir.to_path_buf());

    for entry in fs::read_dir(log_root).map_err(|e| ArchiveError::io(log_root, e))? {
        let entry = entry.map_err(|e| ArchiveError::io(log_root, e))?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let canonical = fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
        if canonical == exclude_dir {
            continue;
        }

        let files = match list_log_files(&dir, filter, &[]) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to list log folder");
                continue;
            }
        };
        if files.len() < trigger_count {
            continue;
        }
        for file in files.iter().take(cleanup_count) {
            outcome.remove(&file.path);
        }
    }

    Ok(outcome)
}
