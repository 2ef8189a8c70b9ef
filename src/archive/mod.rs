//! Log archiving
//!
//! Groups rotated log files into fixed-size chronological sets, moves each set
//! into a compressed container and keeps the archive directory bounded.

pub mod archiver;
mod compress;
pub mod container;
pub mod error;
pub mod events;
pub mod retention;
pub mod set;

pub use archiver::{LogArchiver, MaintenanceReport};
pub use error::ArchiveError;
pub use events::{
    create_channel, ArchiveEvent, ArchiveEventReceiver, ArchiveEventSender, FailedFile,
};
pub use retention::CleanupOutcome;
pub use set::ArchiveSet;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::session::expand_home;

/// Name of the archive subdirectory used when none is configured
pub const ARCHIVE_SUBDIR: &str = "archives";

/// Container format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionStyle {
    #[default]
    Zip,
    Gzip,
}

impl CompressionStyle {
    /// Container file extension
    pub fn extension(&self) -> &'static str {
        match self {
            CompressionStyle::Zip => "zip",
            CompressionStyle::Gzip => "gz",
        }
    }
}

/// Compression effort
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionLevel {
    #[default]
    Optimal,
    Fastest,
    NoCompression,
    SmallestSize,
}

impl CompressionLevel {
    fn numeric(&self) -> u32 {
        match self {
            CompressionLevel::Optimal => 6,
            CompressionLevel::Fastest => 1,
            CompressionLevel::NoCompression => 0,
            CompressionLevel::SmallestSize => 9,
        }
    }

    pub(crate) fn flate2(&self) -> flate2::Compression {
        flate2::Compression::new(self.numeric())
    }

    pub(crate) fn zip_method(&self) -> zip::CompressionMethod {
        match self {
            CompressionLevel::NoCompression => zip::CompressionMethod::Stored,
            _ => zip::CompressionMethod::Deflated,
        }
    }

    pub(crate) fn zip_level(&self) -> Option<i64> {
        match self {
            CompressionLevel::NoCompression => None,
            other => Some(i64::from(other.numeric())),
        }
    }
}

/// Archive settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory scanned for log files; blank means the session log directory
    #[serde(default)]
    pub search_path: PathBuf,

    /// Directory receiving containers; blank means `{search_path}/archives`
    #[serde(default)]
    pub archive_path: PathBuf,

    /// Wildcard over file names
    #[serde(default = "default_file_filter")]
    pub file_filter: String,

    /// Files per container
    #[serde(default = "default_set_size")]
    pub set_size: usize,

    /// Matching files needed before archiving kicks in
    #[serde(default = "default_trigger_count")]
    pub trigger_count: usize,

    /// Containers to keep
    #[serde(default = "default_cleanup_count")]
    pub cleanup_count: usize,

    #[serde(default)]
    pub compression_level: CompressionLevel,

    #[serde(default)]
    pub compression_style: CompressionStyle,
}

fn default_file_filter() -> String {
    "*.*".to_string()
}

fn default_set_size() -> usize {
    15
}

fn default_trigger_count() -> usize {
    20
}

fn default_cleanup_count() -> usize {
    50
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            search_path: PathBuf::new(),
            archive_path: PathBuf::new(),
            file_filter: default_file_filter(),
            set_size: default_set_size(),
            trigger_count: default_trigger_count(),
            cleanup_count: default_cleanup_count(),
            compression_level: CompressionLevel::default(),
            compression_style: CompressionStyle::default(),
        }
    }
}

impl ArchiveConfig {
    /// Config for a search path with default everything else
    pub fn new(search_path: impl Into<PathBuf>) -> Self {
        Self {
            search_path: search_path.into(),
            ..Self::default()
        }
    }

    /// Copy with zero or blank settings replaced by their defaults
    ///
    /// The archive path never equals the search path; if it would, the
    /// `archives` subdirectory is used instead.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        config.search_path = expand_home(&config.search_path);
        config.archive_path = expand_home(&config.archive_path);

        if config.set_size == 0 {
            config.set_size = default_set_size();
        }
        if config.trigger_count == 0 {
            config.trigger_count = default_trigger_count();
        }
        if config.cleanup_count == 0 {
            config.cleanup_count = default_cleanup_count();
        }
        if config.file_filter.trim().is_empty() {
            config.file_filter = default_file_filter();
        }
        if config.archive_path.as_os_str().is_empty() || config.archive_path == config.search_path
        {
            config.archive_path = config.search_path.join(ARCHIVE_SUBDIR);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_defaults() {
        let config = ArchiveConfig {
            search_path: PathBuf::from("/logs"),
            archive_path: PathBuf::new(),
            file_filter: "  ".to_string(),
            set_size: 0,
            trigger_count: 0,
            cleanup_count: 0,
            compression_level: CompressionLevel::Fastest,
            compression_style: CompressionStyle::Gzip,
        }
        .normalized();

        assert_eq!(config.archive_path, PathBuf::from("/logs/archives"));
        assert_eq!(config.file_filter, "*.*");
        assert_eq!(config.set_size, 15);
        assert_eq!(config.trigger_count, 20);
        assert_eq!(config.cleanup_count, 50);
        assert_eq!(config.compression_level, CompressionLevel::Fastest);
    }

    #[test]
    fn test_same_archive_and_search_path() {
        let mut config = ArchiveConfig::new("/logs");
        config.archive_path = PathBuf::from("/logs");
        assert_eq!(
            config.normalized().archive_path,
            PathBuf::from("/logs/archives")
        );

        config.archive_path = PathBuf::from("/backup");
        assert_eq!(config.normalized().archive_path, PathBuf::from("/backup"));
    }

    #[test]
    fn test_archive_config_from_toml() {
        let config: ArchiveConfig = toml::from_str(
            r#"
            search_path = "/var/log/app"
            compression_style = "gzip"
            compression_level = "smallest_size"
            set_size = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.set_size, 10);
        assert_eq!(config.trigger_count, 20);
        assert_eq!(config.compression_style, CompressionStyle::Gzip);
        assert_eq!(config.compression_level, CompressionLevel::SmallestSize);
        assert_eq!(config.file_filter, "*.*");
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(CompressionLevel::NoCompression.zip_level(), None);
        assert_eq!(
            CompressionLevel::NoCompression.zip_method(),
            zip::CompressionMethod::Stored
        );
        assert_eq!(CompressionLevel::SmallestSize.zip_level(), Some(9));
        assert_eq!(CompressionLevel::Fastest.flate2().level(), 1);
    }
}
