//! Output containers
//!
//! A container is one compressed file holding a set of log files. Zip
//! containers are regular zip archives; gzip containers are multi-member gzip
//! streams with one member per log file, each carrying its file name.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::GzBuilder;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{ArchiveError, CompressionLevel, CompressionStyle};

/// An open, writable container
pub enum Container {
    Zip {
        path: PathBuf,
        writer: ZipWriter<File>,
    },
    Gzip {
        path: PathBuf,
        file: File,
    },
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::Zip { path, .. } => f.debug_tuple("Zip").field(path).finish(),
            Container::Gzip { path, .. } => f.debug_tuple("Gzip").field(path).finish(),
        }
    }
}

impl Container {
    /// Create an empty container at `path`, truncating any existing file
    pub fn create(path: &Path, style: CompressionStyle) -> Result<Self, ArchiveError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .read(true)
            .open(path)
            .map_err(|e| ArchiveError::io(path, e))?;

        Ok(match style {
            CompressionStyle::Zip => Container::Zip {
                path: path.to_path_buf(),
                writer: ZipWriter::new(file),
            },
            CompressionStyle::Gzip => Container::Gzip {
                path: path.to_path_buf(),
                file,
            },
        })
    }

    /// Path of the container file
    pub fn path(&self) -> &Path {
        match self {
            Container::Zip { path, .. } | Container::Gzip { path, .. } => path,
        }
    }

    /// Add `source` as an entry called `entry_name`
    ///
    /// A failed entry is rolled back so the container stays readable.
    pub fn add_file(
        &mut self,
        source: &Path,
        entry_name: &str,
        level: CompressionLevel,
    ) -> Result<(), ArchiveError> {
        let mut input = File::open(source).map_err(|e| ArchiveError::io(source, e))?;

        match self {
            Container::Zip { writer, .. } => {
                let options = SimpleFileOptions::default()
                    .compression_method(level.zip_method())
                    .compression_level(level.zip_level());
                writer.start_file(entry_name, options)?;
                if let Err(e) = io::copy(&mut input, writer) {
                    // Best effort: the copy error is the one worth reporting
                    let _ = writer.abort_file();
                    return Err(ArchiveError::io(source, e));
                }
                Ok(())
            }
            Container::Gzip { path, file } => {
                let start = file
                    .stream_position()
                    .map_err(|e| ArchiveError::io(path.as_path(), e))?;
                if let Err(e) = write_gzip_member(file, &mut input, entry_name, level) {
                    // Cut the partial member off again
                    let _ = file.set_len(start);
                    let _ = file.seek(SeekFrom::Start(start));
                    return Err(ArchiveError::io(source, e));
                }
                Ok(())
            }
        }
    }

    /// Flush and close the container, returning its path
    pub fn finish(self) -> Result<PathBuf, ArchiveError> {
        match self {
            Container::Zip { path, writer } => {
                let file = writer.finish()?;
                file.sync_all().map_err(|e| ArchiveError::io(path.as_path(), e))?;
                Ok(path)
            }
            Container::Gzip { path, mut file } => {
                file.flush()
                    .and_then(|_| file.sync_all())
                    .map_err(|e| ArchiveError::io(path.as_path(), e))?;
                Ok(path)
            }
        }
    }
}

fn write_gzip_member(
    out: &mut File,
    input: &mut File,
    entry_name: &str,
    level: CompressionLevel,
) -> io::Result<()> {
    let mut encoder = GzBuilder::new()
        .filename(entry_name)
        .write(&mut *out, level.flate2());
    io::copy(input, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}
