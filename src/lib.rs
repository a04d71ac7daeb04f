//! Index Export - streams a search index export into a local file and
//! resumes it after an interrupted run.
//!
//! An interrupted export leaves a file whose tail may be torn mid-event. With
//! recovery enabled, the file is scanned backward for the last event that can
//! safely be kept, truncated right after it, and the export is re-requested
//! from that event's timestamp. See [`recovery`] for the scan and [`export`]
//! for the run as a whole.

pub mod config;
pub mod export;
pub mod extract;
pub mod persistence;
pub mod recovery;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::ExportConfig;
pub use export::{ExportError, ExportSummary, Exporter};
pub use types::{ExportFormat, ExportSession, Timestamp};
