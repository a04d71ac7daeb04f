//! Low-level fsync operations for durability.
//!
//! A truncation that is not on disk before the resumed stream is appended
//! can resurface after a power loss as stale bytes in the middle of the
//! file. Creating the output file also needs the directory entry synced.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata (including its length) to disk.
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory so entries created in it are durable.
///
/// An empty path (the parent of a bare file name) means the current
/// directory.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir_path = if dir_path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir_path
    };
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}
