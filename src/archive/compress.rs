//! Compression engine
//!
//! Moves the files of each archive set into its container, deleting sources as
//! they are added and reporting progress through archive events.

use std::fs;
use std::time::Instant;

use super::events::{emit, ArchiveEvent, ArchiveEventSender, FailedFile};
use super::set::{file_name_of, ArchiveSet};
use super::CompressionLevel;

/// Compress every set in order
///
/// Returns true only if every file was added and every container exists
/// afterwards. Failed files are skipped, pushed onto `failures` and reported
/// as events.
pub fn compress_sets(
    sets: &mut [ArchiveSet],
    level: CompressionLevel,
    events: Option<&ArchiveEventSender>,
    failures: &mut Vec<FailedFile>,
) -> bool {
    let mut all_ok = true;

    for set in sets.iter_mut() {
        let container_name = set.container_name();
        let Some(mut container) = set.take_container() else {
            tracing::warn!(container = %container_name, "Archive set already compressed");
            continue;
        };
        let started = Instant::now();
        let total = set.files().len();

        for (index, source) in set.files().iter().enumerate() {
            let file_name = file_name_of(source);
            let done = index + 1;

            if let Err(e) = container.add_file(source, &file_name, level) {
                tracing::warn!(container = %container_name, file = %file_name, error = %e, "Failed to archive file");
                record_failure(
                    events,
                    failures,
                    FailedFile {
                        container_name: container_name.clone(),
                        file_name,
                        error: e.to_string(),
                    },
                );
                all_ok = false;
                continue;
            }

            emit(
                events,
                ArchiveEvent::FileAdded {
                    container_name: container_name.clone(),
                    file_name: file_name.clone(),
                    files_remaining: total - done,
                    percent_done: done as f64 * 100.0 / total as f64,
                },
            );

            if let Err(e) = fs::remove_file(source) {
                tracing::warn!(file = %file_name, error = %e, "Failed to remove archived file");
                record_failure(
                    events,
                    failures,
                    FailedFile {
                        container_name: container_name.clone(),
                        file_name,
                        error: e.to_string(),
                    },
                );
                all_ok = false;
            }
        }

        match container.finish() {
            Ok(path) => {
                let byte_size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                let elapsed = started.elapsed();
                tracing::info!(
                    container = %container_name,
                    bytes = byte_size,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Archive completed"
                );
                emit(
                    events,
                    ArchiveEvent::ArchiveCompleted {
                        container_name: container_name.clone(),
                        byte_size,
                        elapsed,
                    },
                );
            }
            Err(e) => {
                tracing::error!(container = %container_name, error = %e, "Failed to close container");
                all_ok = false;
            }
        }

        if !set.container_path().exists() {
            all_ok = false;
        }
    }

    all_ok
}

fn record_failure(
    events: Option<&ArchiveEventSender>,
    failures: &mut Vec<FailedFile>,
    failed: FailedFile,
) {
    emit(events, failed.clone().into());
    failures.push(failed);
}
