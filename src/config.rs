//! Export tuning.
//!
//! - **Window size**: bytes per recovery read, 64 KiB by default
//!   (`INDEX_EXPORT_WINDOW_SIZE`). Events longer than a window can defeat
//!   the resume scan, so exports of very large events want a larger one.
//! - **Chunk size**: bytes per copy step, 8 KiB by default
//!   (`INDEX_EXPORT_CHUNK_SIZE`).
//! - **Sealing**: whether a resumed export closes the kept prefix with the
//!   format's document terminator before appending (`INDEX_EXPORT_SEAL`).
//!   Off by default, which appends verbatim.

use crate::export::DEFAULT_CHUNK_SIZE;
use crate::recovery::DEFAULT_WINDOW_SIZE;

/// Configuration for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Bytes read per recovery window.
    pub window_size: usize,

    /// Bytes copied from the stream per write.
    pub chunk_size: usize,

    /// Append the document terminator before resuming.
    pub seal_resumed: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportConfig {
    /// Creates an `ExportConfig` with default values.
    pub fn new() -> Self {
        ExportConfig {
            window_size: DEFAULT_WINDOW_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            seal_resumed: false,
        }
    }

    /// Creates an `ExportConfig` from environment variables.
    ///
    /// Unset or unparsable values use defaults. Zero sizes are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let size = |key: &str| {
            lookup(key)
                .and_then(|s| s.trim().parse::<usize>().ok())
                .filter(|&n| n > 0)
        };
        let defaults = Self::new();

        ExportConfig {
            window_size: size("INDEX_EXPORT_WINDOW_SIZE").unwrap_or(defaults.window_size),
            chunk_size: size("INDEX_EXPORT_CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            seal_resumed: lookup("INDEX_EXPORT_SEAL")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.seal_resumed),
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_seal_resumed(mut self, seal: bool) -> Self {
        self.seal_resumed = seal;
        self
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
