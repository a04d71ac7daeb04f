//! Core domain types for the index exporter.
//!
//! These types are shared by the extractors, the recovery engine and the
//! export orchestrator.

pub mod format;
pub mod session;
pub mod timestamp;

pub use format::{ExportFormat, UnknownFormat};
pub use session::{DEFAULT_INDEX, DEFAULT_OUTPUT_PATH, ExportSession};
pub use timestamp::Timestamp;
