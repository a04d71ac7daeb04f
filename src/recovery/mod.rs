//! Recovery of a partially written export file.
//!
//! # Recovery
//!
//! Given an output file of unknown integrity:
//! 1. Scan backward ([`scan_backward`]) for the latest event whose
//!    timestamp differs from the file's final event
//! 2. Resolve the start of the event after it ([`resolve_cut`])
//! 3. Truncate there and resume the export from that event's timestamp
//!
//! If either step comes up empty the file is truncated to zero and the
//! export starts over. Neither case is an error: the decision is always one
//! of the two, and only I/O failures propagate.
//!
//! # Duplicates
//!
//! The kept file ends with the run of events sharing the resume timestamp.
//! The resumed stream starts at that timestamp (inclusive), so that run is
//! written a second time. Nothing older is repeated and nothing is skipped.

pub mod resolve;
pub mod scan;
pub mod window;

pub use resolve::resolve_cut;
pub use scan::{Candidate, ScanReport, ScanState, TailMark, scan_backward};
pub use window::{DEFAULT_WINDOW_SIZE, RandomAccess, Window, read_window};

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::extract::EventGrammar;
use crate::types::Timestamp;

/// How to prepare the output file before streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryDecision {
    /// Length to truncate the file to.
    pub truncate_to: u64,
    /// Timestamp to resume from; `None` restarts the export from scratch.
    pub resume_from: Option<Timestamp>,
}

impl RecoveryDecision {
    /// Discard everything and start over.
    pub fn restart() -> Self {
        RecoveryDecision {
            truncate_to: 0,
            resume_from: None,
        }
    }

    /// Keep `truncate_to` bytes and resume from `timestamp`.
    pub fn resume(truncate_to: u64, timestamp: Timestamp) -> Self {
        RecoveryDecision {
            truncate_to,
            resume_from: Some(timestamp),
        }
    }

    pub fn is_restart(&self) -> bool {
        self.resume_from.is_none()
    }
}

/// Why a recovery fell back to starting over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartReason {
    /// The file was empty; there was nothing to scan.
    EmptyFile,
    /// No event differing from the final run exists in the file.
    NoBoundary,
    /// A candidate was found but no event start follows it.
    MarkerNotFound,
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RestartReason::EmptyFile => "output file is empty",
            RestartReason::NoBoundary => "no event boundary found",
            RestartReason::MarkerNotFound => "no event start after the resume point",
        };
        f.write_str(s)
    }
}

/// A recovery decision and how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPlan {
    pub decision: RecoveryDecision,
    /// Set when the decision is a restart.
    pub restart_reason: Option<RestartReason>,
    /// Windows read by the backward scan.
    pub windows_read: u64,
}

impl RecoveryPlan {
    fn restart(reason: RestartReason, windows_read: u64) -> Self {
        RecoveryPlan {
            decision: RecoveryDecision::restart(),
            restart_reason: Some(reason),
            windows_read,
        }
    }
}

/// Decides how to recover `store`. Reads only; truncation is the caller's.
pub fn plan_recovery<S, G>(
    store: &mut S,
    grammar: &G,
    window_size: usize,
) -> io::Result<RecoveryPlan>
where
    S: RandomAccess + ?Sized,
    G: EventGrammar + ?Sized,
{
    if store.len()? == 0 {
        debug!("Output file is empty, nothing to recover");
        return Ok(RecoveryPlan::restart(RestartReason::EmptyFile, 0));
    }

    let report = scan_backward(store, grammar, window_size)?;
    let Some(candidate) = report.candidate else {
        info!(
            windows_read = report.windows_read,
            "No resume point in output file, restarting export"
        );
        return Ok(RecoveryPlan::restart(
            RestartReason::NoBoundary,
            report.windows_read,
        ));
    };

    match resolve_cut(store, grammar, &candidate, window_size)? {
        Some(cut) => Ok(RecoveryPlan {
            decision: RecoveryDecision::resume(cut, candidate.timestamp),
            restart_reason: None,
            windows_read: report.windows_read,
        }),
        None => {
            warn!(
                timestamp = %candidate.timestamp,
                offset = candidate.offset,
                "No event start after resume point, restarting export"
            );
            Ok(RecoveryPlan::restart(
                RestartReason::MarkerNotFound,
                report.windows_read,
            ))
        }
    }
}
