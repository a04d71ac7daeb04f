//! Chunked copy of the export stream into the output file.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Default bytes per copy step (8 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// A copy that stopped early. `written` bytes reached the writer first.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("reading the stream failed after {written} bytes: {source}")]
    Read {
        written: u64,
        #[source]
        source: io::Error,
    },

    #[error("writing the output failed after {written} bytes: {source}")]
    Write {
        written: u64,
        #[source]
        source: io::Error,
    },
}

impl CopyError {
    /// Bytes written before the failure.
    pub fn written(&self) -> u64 {
        match self {
            CopyError::Read { written, .. } | CopyError::Write { written, .. } => *written,
        }
    }
}

/// Copies `reader` to `writer` until end of stream, `chunk_size` bytes at a
/// time, then flushes. Returns the byte count.
pub fn copy_stream<R, W>(mut reader: R, writer: &mut W, chunk_size: usize) -> Result<u64, CopyError>
where
    R: Read,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut written = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(CopyError::Read { written, source }),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|source| CopyError::Write { written, source })?;
        written += n as u64;
    }
    writer
        .flush()
        .map_err(|source| CopyError::Write { written, source })?;
    Ok(written)
}
