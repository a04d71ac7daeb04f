//! The export output file.
//!
//! The file supports the four operations recovery needs: length, reads at
//! an offset, truncation in place, and appends. It is opened in append mode,
//! so writes always land at the current end, including right after a
//! truncation.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::fsync::{fsync_dir, fsync_file};
use crate::recovery::window::{RandomAccess, seek_read};

/// Errors that can occur during output file operations.
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OutputError {
    fn io(path: &Path, source: io::Error) -> Self {
        OutputError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for output file operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// What is at the output path before the export starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Missing,
    Empty,
    /// Exists with this many bytes.
    NonEmpty(u64),
}

/// Looks at the output path without opening it for writing.
pub fn inspect(path: &Path) -> Result<OutputState> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Ok(OutputState::Empty),
        Ok(meta) => Ok(OutputState::NonEmpty(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(OutputState::Missing),
        Err(e) => Err(OutputError::io(path, e)),
    }
}

/// An open output file.
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    path: PathBuf,
}

impl OutputFile {
    /// Creates a new output file. Fails if the path already exists.
    ///
    /// The parent directory is fsynced so the new entry is durable.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| OutputError::io(&path, e))?;

        let parent = path.parent().unwrap_or(Path::new(""));
        fsync_dir(parent).map_err(|e| OutputError::io(parent, e))?;

        debug!(path = %path.display(), "Created output file");
        Ok(OutputFile { file, path })
    }

    /// Opens an existing output file for recovery and appending.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| OutputError::io(&path, e))?;
        Ok(OutputFile { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length in bytes.
    pub fn len(&self) -> Result<u64> {
        self.file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|e| OutputError::io(&self.path, e))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Shrinks the file to `len` bytes in place and syncs the new length.
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file
            .set_len(len)
            .and_then(|()| fsync_file(&self.file))
            .map_err(|e| OutputError::io(&self.path, e))?;
        debug!(path = %self.path.display(), len, "Truncated output file");
        Ok(())
    }

    /// Appends `bytes` at the end of the file.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .map_err(|e| OutputError::io(&self.path, e))
    }

    /// Forces written data to disk.
    pub fn sync(&self) -> Result<()> {
        fsync_file(&self.file).map_err(|e| OutputError::io(&self.path, e))
    }
}

impl RandomAccess for OutputFile {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        seek_read(&mut self.file, offset, buf)
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
