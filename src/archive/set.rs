//! Archive set builder
//!
//! Scans the search path for rotated log files and partitions them into
//! fixed-size chronological groups, each paired with an empty container named
//! after the first and last timestamp token of the group.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::pattern::Wildcard;
use crate::stamp;

use super::container::Container;
use super::{ArchiveConfig, ArchiveError, CompressionStyle};

/// One group of source files and the container they go into
#[derive(Debug)]
pub struct ArchiveSet {
    files: Vec<PathBuf>,
    container_path: PathBuf,
    container: Option<Container>,
}

impl ArchiveSet {
    /// Source files in chronological order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Path of the container
    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    /// Container file name
    pub fn container_name(&self) -> String {
        file_name_of(&self.container_path)
    }

    pub(crate) fn take_container(&mut self) -> Option<Container> {
        self.container.take()
    }
}

/// A candidate source file
#[derive(Debug, Clone)]
pub(crate) struct LogFile {
    pub path: PathBuf,
    pub created: SystemTime,
}

/// List files directly inside `dir` whose names match `filter`
///
/// Sorted by creation time ascending, falling back to modification time where
/// the platform has no creation time. Ties are broken by name.
pub(crate) fn list_log_files(
    dir: &Path,
    filter: &Wildcard,
    exclude: &[PathBuf],
) -> Result<Vec<LogFile>, ArchiveError> {
    let entries = fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, e))?;
    let exclude: Vec<PathBuf> = exclude.iter().map(|p| canonical(p)).collect();

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ArchiveError::io(dir, e))?;
        let path = entry.path();
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() || !filter.matches(&file_name_of(&path)) {
            continue;
        }
        if exclude.contains(&canonical(&path)) {
            continue;
        }
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        files.push(LogFile { path, created });
    }

    files.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}

/// Build the archive sets for the configured search path
///
/// Only complete groups of `set_size` files are built; the trailing partial
/// group stays in place for a later run. Containers left over from earlier
/// runs under the same name are replaced; sets of this run that would share a
/// name get a `_{n}` counter instead.
pub fn build_sets(
    config: &ArchiveConfig,
    session_name: &str,
    exclude: &[PathBuf],
) -> Result<Vec<ArchiveSet>, ArchiveError> {
    let config = config.normalized();
    if !config.search_path.is_dir() {
        return Err(ArchiveError::SearchPathMissing(config.search_path));
    }

    let filter = Wildcard::new(&config.file_filter);
    let files = list_log_files(&config.search_path, &filter, exclude)?;
    let groups = files.chunks_exact(config.set_size);
    if groups.len() == 0 {
        return Ok(Vec::new());
    }

    fs::create_dir_all(&config.archive_path)
        .map_err(|e| ArchiveError::io(&config.archive_path, e))?;

    let mut sets = Vec::with_capacity(groups.len());
    let mut used = HashSet::new();
    for group in groups {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let start = token_for(first);
        let stop = token_for(last);
        let mut name = container_name(session_name, &start, &stop, config.compression_style);
        let mut counter = 1;
        while used.contains(&name) {
            name = numbered_container_name(
                session_name,
                &start,
                &stop,
                counter,
                config.compression_style,
            );
            counter += 1;
        }
        used.insert(name.clone());
        let container_path = config.archive_path.join(&name);
        if container_path.exists() {
            fs::remove_file(&container_path).map_err(|e| ArchiveError::io(&container_path, e))?;
            tracing::debug!(container = %name, "Replacing existing container");
        }
        let container = Container::create(&container_path, config.compression_style)?;

        sets.push(ArchiveSet {
            files: group.iter().map(|f| f.path.clone()).collect(),
            container_path,
            container: Some(container),
        });
    }

    tracing::debug!(
        sets = sets.len(),
        files = files.len(),
        "Built archive sets"
    );
    Ok(sets)
}

/// `{session}_{start}_{stop}.{ext}`
pub fn container_name(
    session_name: &str,
    start: &str,
    stop: &str,
    style: CompressionStyle,
) -> String {
    format!("{}_{}_{}.{}", session_name, start, stop, style.extension())
}

/// `{session}_{start}_{stop}_{n}.{ext}`, for sets sharing start and stop tokens
pub fn numbered_container_name(
    session_name: &str,
    start: &str,
    stop: &str,
    counter: usize,
    style: CompressionStyle,
) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        session_name,
        start,
        stop,
        counter,
        style.extension()
    )
}

/// Check whether `file_name` is a container of `session_name` in `style`
///
/// Only exact `{session}_{start}_{stop}[_{n}].{ext}` names with valid tokens
/// match, so sessions whose names share a prefix stay apart.
pub fn is_container_of(file_name: &str, session_name: &str, style: CompressionStyle) -> bool {
    let Some(rest) = file_name
        .strip_prefix(session_name)
        .and_then(|r| r.strip_prefix('_'))
        .and_then(|r| r.strip_suffix(style.extension()))
        .and_then(|r| r.strip_suffix('.'))
    else {
        return false;
    };

    let parts: Vec<&str> = rest.split('_').collect();
    let (tokens, counter) = match parts.as_slice() {
        [start, stop] => ([*start, *stop], None),
        [start, stop, n] => ([*start, *stop], Some(*n)),
        _ => return false,
    };
    let counter_ok =
        counter.map_or(true, |n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    counter_ok && tokens.iter().all(|t| stamp::parse_token(t).is_some())
}

/// Timestamp token for a file, from its name or else its own timestamp
fn token_for(file: &LogFile) -> String {
    let name = file_name_of(&file.path);
    if let Some(token) = stamp::find_token(&name) {
        return token;
    }
    let fallback = stamp::format_token(&DateTime::<Local>::from(file.created));
    tracing::warn!(
        file = %name,
        token = %fallback,
        "No timestamp token in file name, using file time"
    );
    fallback
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
