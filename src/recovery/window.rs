//! Fixed-size byte windows read from the output file.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// Default window size for the backward scan (64 KiB).
pub const DEFAULT_WINDOW_SIZE: usize = 64 * 1024;

/// A contiguous byte range of the output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    start: u64,
    bytes: Vec<u8>,
}

impl Window {
    pub fn new(start: u64, bytes: Vec<u8>) -> Self {
        Window { start, bytes }
    }

    /// File offset of the first byte.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// File offset just past the last byte.
    pub fn end(&self) -> u64 {
        self.start + self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the window begins at offset 0, so its first byte is known to
    /// start a record rather than continue one.
    pub fn is_at_file_start(&self) -> bool {
        self.start == 0
    }

    /// Converts an offset within the window to a file offset.
    pub fn file_offset(&self, offset: usize) -> u64 {
        self.start + offset as u64
    }
}

/// A byte store that supports length queries and positioned reads.
pub trait RandomAccess {
    /// Current length in bytes.
    fn len(&mut self) -> io::Result<u64>;

    /// Reads into `buf` starting at `offset`, filling as much of it as the
    /// store has. Returns the number of bytes read; short only at the end.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

impl RandomAccess for File {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        seek_read(self, offset, buf)
    }
}

impl<T: AsRef<[u8]>> RandomAccess for Cursor<T> {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().as_ref().len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        seek_read(self, offset, buf)
    }
}

/// Reads up to `len` bytes at `start` into a new window.
pub fn read_window<S: RandomAccess + ?Sized>(
    store: &mut S,
    start: u64,
    len: usize,
) -> io::Result<Window> {
    let mut bytes = vec![0u8; len];
    let read = store.read_at(start, &mut bytes)?;
    bytes.truncate(read);
    Ok(Window::new(start, bytes))
}

pub(crate) fn seek_read<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    buf: &mut [u8],
) -> io::Result<usize> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn reads_window_from_cursor() {
        let mut store = Cursor::new(b"0123456789".to_vec());
        let window = read_window(&mut store, 3, 4).unwrap();
        assert_eq!(window.bytes(), b"3456");
        assert_eq!(window.start(), 3);
        assert_eq!(window.end(), 7);
        assert_eq!(window.file_offset(2), 5);
        assert!(!window.is_at_file_start());
    }

    #[test]
    fn short_read_at_end() {
        let mut store = Cursor::new(b"0123456789".to_vec());
        let window = read_window(&mut store, 8, 16).unwrap();
        assert_eq!(window.bytes(), b"89");

        let past = read_window(&mut store, 20, 4).unwrap();
        assert!(past.is_empty());
    }

    #[test]
    fn reads_window_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.out");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"abcdefgh").unwrap();
        drop(file);

        let mut file = File::open(&path).unwrap();
        assert_eq!(RandomAccess::len(&mut file).unwrap(), 8);
        let window = read_window(&mut file, 0, 3).unwrap();
        assert_eq!(window.bytes(), b"abc");
        assert!(window.is_at_file_start());
    }
}
