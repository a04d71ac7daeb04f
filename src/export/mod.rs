//! The export run: prepare the output file, then stream into it.
//!
//! # Flow
//!
//! 1. Look at the output path ([`prepare_output`]): create it, accept it
//!    empty, refuse it non-empty, or recover it when asked to
//! 2. Issue one request, resuming from the recovered timestamp if any
//! 3. Append the stream verbatim in fixed-size chunks, then fsync
//!
//! A failure at any step leaves the file as it is. The next run with
//! `recover` repairs whatever tail the failure left behind.

pub mod orchestrator;
pub mod stream;

pub use orchestrator::{ExportSummary, Exporter, PreparedOutput, prepare_output};
pub use stream::{CopyError, DEFAULT_CHUNK_SIZE, copy_stream};

use std::path::PathBuf;

use thiserror::Error;

use crate::persistence::OutputError;
use crate::source::SourceError;

/// Errors that abort an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The output file has content and recovery was not requested.
    #[error(
        "output file {} already exists and is not empty; resume it with --recover or choose another path",
        path.display()
    )]
    ExistingOutput { path: PathBuf },

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("export stream failed: {0}")]
    Stream(#[from] CopyError),
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
