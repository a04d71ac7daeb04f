//! Backward scan for the last safe resume point.
//!
//! The output file is written in descending time order, so the events at
//! its end share the file's smallest timestamps. When a run is interrupted
//! its final event may be torn, and the run of events sharing that final
//! timestamp may be incomplete. The scan walks the file backward, one
//! window at a time, until it meets an event whose timestamp differs from
//! the final one. Resuming from that event's timestamp re-requests every
//! event at or below it, so nothing after it needs to be kept.
//!
//! # Tail mark
//!
//! The only state carried from one window to the next is the tail mark:
//! the timestamp of the file's final event. It is taken from the first
//! (rightmost) window that holds any event structure. If that window's
//! final event-opening marker lies beyond its last readable timestamp, the
//! final event is a fragment whose timestamp cannot be read, and the mark
//! is [`TailMark::Fragment`], which no timestamp equals.

use std::io;

use tracing::{debug, trace};

use super::window::{RandomAccess, Window, read_window};
use crate::extract::EventGrammar;
use crate::types::Timestamp;

/// What the file's final event looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailMark {
    /// The final event's timestamp is readable.
    Timestamp(Timestamp),
    /// The final event is torn before the end of its timestamp.
    Fragment,
}

impl TailMark {
    /// Whether `timestamp` belongs to the final run of events.
    pub fn matches(&self, timestamp: &Timestamp) -> bool {
        match self {
            TailMark::Timestamp(tail) => tail == timestamp,
            TailMark::Fragment => false,
        }
    }
}

/// The latest event that precedes the final run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Timestamp of that event; the resume point.
    pub timestamp: Timestamp,
    /// File offset of its boundary.
    pub offset: u64,
}

/// State threaded through the windows of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    tail: Option<TailMark>,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tail mark, once a window with event structure has been seen.
    pub fn tail(&self) -> Option<&TailMark> {
        self.tail.as_ref()
    }

    /// Examines one window, moving right to left through the file.
    ///
    /// Returns the candidate if this window holds an event whose timestamp
    /// differs from the tail mark.
    pub fn step<G: EventGrammar + ?Sized>(
        &mut self,
        grammar: &G,
        window: &Window,
    ) -> Option<Candidate> {
        let boundaries = grammar.boundaries(window);

        if self.tail.is_none() {
            let last_start = grammar.last_event_start(window);
            self.tail = match (boundaries.last(), last_start) {
                (Some(last), Some(start)) if start > last.offset => Some(TailMark::Fragment),
                (Some(last), _) => Some(TailMark::Timestamp(last.timestamp.clone())),
                (None, Some(_)) => Some(TailMark::Fragment),
                (None, None) => None,
            };
            trace!(tail = ?self.tail, window_start = window.start(), "Tail mark");
        }

        let tail = self.tail.as_ref()?;
        boundaries
            .iter()
            .rev()
            .find(|b| !tail.matches(&b.timestamp))
            .map(|b| Candidate {
                timestamp: b.timestamp.clone(),
                offset: window.file_offset(b.offset),
            })
    }
}

/// Result of a backward scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// The resume point, or `None` if the file start was reached without one.
    pub candidate: Option<Candidate>,
    /// The tail mark the scan settled on, if any.
    pub tail: Option<TailMark>,
    /// Number of windows read.
    pub windows_read: u64,
}

/// Scans `store` backward in windows of `window_size` bytes.
///
/// Windows do not overlap: each ends where the previous one started. A file
/// of `n` bytes therefore costs at most `ceil(n / window_size)` reads.
pub fn scan_backward<S, G>(
    store: &mut S,
    grammar: &G,
    window_size: usize,
) -> io::Result<ScanReport>
where
    S: RandomAccess + ?Sized,
    G: EventGrammar + ?Sized,
{
    let window_size = window_size.max(1) as u64;
    let file_len = store.len()?;
    let mut state = ScanState::new();
    let mut windows_read = 0;

    let mut end = file_len;
    while end > 0 {
        let start = end.saturating_sub(window_size);
        let window = read_window(store, start, (end - start) as usize)?;
        windows_read += 1;

        if let Some(candidate) = state.step(grammar, &window) {
            debug!(
                timestamp = %candidate.timestamp,
                offset = candidate.offset,
                windows_read,
                "Found resume candidate"
            );
            return Ok(ScanReport {
                candidate: Some(candidate),
                tail: state.tail,
                windows_read,
            });
        }

        // A short read means the file shrank underneath us; stop rather
        // than read the same range again.
        if window.is_empty() {
            break;
        }
        end = start;
    }

    debug!(windows_read, file_len, "No resume candidate before file start");
    Ok(ScanReport {
        candidate: None,
        tail: state.tail,
        windows_read,
    })
}
