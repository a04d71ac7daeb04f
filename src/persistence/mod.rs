//! Persistence of the export output file.
//!
//! # Crash Safety
//!
//! The output file is only ever appended to or truncated in place:
//! - A crash mid-append leaves a torn tail, repaired by the next run's
//!   recovery scan rather than by this run
//! - Truncation uses `set_len`, never a rewrite, and is fsynced before any
//!   new bytes are appended
//! - Creating the file fsyncs its directory so the entry survives a crash

pub mod fsync;
pub mod output;

pub use fsync::{fsync_dir, fsync_file};
pub use output::{OutputError, OutputFile, OutputState, inspect};
