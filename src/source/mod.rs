//! Where exported events come from.
//!
//! The search service is reached through an [`ExportSource`]: given an
//! [`ExportRequest`] it returns a byte stream in the requested format,
//! newest events first. [`CommandSource`] runs an external command and
//! reads its stdout; tests substitute a scripted source.

pub mod command;
pub mod request;

pub use command::{CommandSource, CommandStream};
pub use request::{EARLIEST_TIME, ExportRequest, SEARCH_TIMEOUT_SECS, TIME_FORMAT};

use std::io::{self, Read};

use thiserror::Error;

/// Errors that can occur when opening an export stream.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source command could not be started.
    #[error("failed to start source command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The source command started without a readable stdout.
    #[error("source command `{command}` has no stdout")]
    NoStdout { command: String },
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Opens export streams.
pub trait ExportSource {
    type Stream: Read;

    /// Starts an export for `request`.
    fn open(&mut self, request: &ExportRequest) -> Result<Self::Stream>;
}
