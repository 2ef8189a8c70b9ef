//! Archiver
//!
//! Owns one archive run: the normalized configuration, the sets built for it
//! and the optional progress channel.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::pattern::Wildcard;

use super::compress::compress_sets;
use super::events::{create_channel, ArchiveEventReceiver, ArchiveEventSender, FailedFile};
use super::retention;
use super::set::{build_sets, list_log_files, ArchiveSet};
use super::{ArchiveConfig, ArchiveError};

/// Outcome of [`LogArchiver::run_maintenance`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    /// Archive sets built
    pub sets: usize,
    /// Every file was archived and every container exists
    pub archived: bool,
    /// Archive history pruning had no failures
    pub cleaned: bool,
}

/// Archives the rotated log files of one session
#[derive(Debug)]
pub struct LogArchiver {
    config: ArchiveConfig,
    session_name: String,
    exclude: Vec<PathBuf>,
    events: Option<ArchiveEventSender>,
    sets: Vec<ArchiveSet>,
    failures: Vec<FailedFile>,
    initialized: bool,
}

impl LogArchiver {
    pub fn new(config: ArchiveConfig, session_name: impl Into<String>) -> Self {
        Self {
            config: config.normalized(),
            session_name: session_name.into(),
            exclude: Vec::new(),
            events: None,
            sets: Vec::new(),
            failures: Vec::new(),
            initialized: false,
        }
    }

    /// Never archive `path`
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude.push(path.into());
        self
    }

    /// The normalized configuration
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Subscribe to progress events
    ///
    /// Only one subscriber is kept; subscribing again replaces it. Events are
    /// dropped while the channel is full; [`LogArchiver::failed_files`] keeps
    /// every failure regardless.
    pub fn subscribe(&mut self, buffer: usize) -> ArchiveEventReceiver {
        let (tx, rx) = create_channel(buffer);
        self.events = Some(tx);
        rx
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Sets built by the last `initialize`
    pub fn sets(&self) -> &[ArchiveSet] {
        &self.sets
    }

    /// Files that failed during the last `archive_log_files`
    pub fn failed_files(&self) -> &[FailedFile] {
        &self.failures
    }

    /// Scan the search path and build the archive sets
    ///
    /// Returns false, without error, when the search path does not exist.
    pub fn initialize(&mut self) -> Result<bool, ArchiveError> {
        self.initialized = false;
        self.sets.clear();

        match build_sets(&self.config, &self.session_name, &self.exclude) {
            Ok(sets) => {
                self.sets = sets;
                self.initialized = true;
                Ok(true)
            }
            Err(ArchiveError::SearchPathMissing(path)) => {
                tracing::warn!(path = %path.display(), "Archive search path does not exist");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Check whether enough matching files have piled up to archive
    pub fn should_archive(&self) -> bool {
        let filter = Wildcard::new(&self.config.file_filter);
        list_log_files(&self.config.search_path, &filter, &self.exclude)
            .map(|files| files.len() >= self.config.trigger_count)
            .unwrap_or(false)
    }

    /// Move every built set into its container
    pub fn archive_log_files(&mut self) -> Result<bool, ArchiveError> {
        if !self.initialized {
            return Err(ArchiveError::NotInitialized);
        }
        self.failures.clear();
        Ok(compress_sets(
            &mut self.sets,
            self.config.compression_level,
            self.events.as_ref(),
            &mut self.failures,
        ))
    }

    /// Keep only the `cleanup_count` most recent containers
    pub fn cleanup_archive_history(&self) -> Result<bool, ArchiveError> {
        if !self.initialized {
            return Err(ArchiveError::NotInitialized);
        }
        let outcome = retention::cleanup_archive_history(
            &self.config.archive_path,
            &self.session_name,
            self.config.compression_style,
            self.config.cleanup_count,
        )?;
        Ok(outcome.is_clean())
    }

    /// Purge the oldest log files from crowded subfolders of `log_root`
    pub fn cleanup_log_folders(&self, log_root: &Path) -> Result<bool, ArchiveError> {
        if !self.initialized {
            return Err(ArchiveError::NotInitialized);
        }
        let filter = Wildcard::new(&self.config.file_filter);
        let outcome = retention::cleanup_log_folders(
            log_root,
            &self.config.archive_path,
            &filter,
            self.config.trigger_count,
            self.config.cleanup_count,
        )?;
        Ok(outcome.is_clean())
    }

    /// Initialize, archive and prune in one go
    pub fn run_maintenance(&mut self) -> Result<MaintenanceReport, ArchiveError> {
        if !self.initialize()? {
            return Ok(MaintenanceReport::default());
        }
        let sets = self.sets.len();
        let archived = self.archive_log_files()?;
        let cleaned = self.cleanup_archive_history()?;
        Ok(MaintenanceReport {
            sets,
            archived,
            cleaned,
        })
    }
}
