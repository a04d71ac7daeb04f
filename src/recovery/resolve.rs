//! Maps a resume candidate to the file offset to truncate at.

use std::io;

use super::scan::Candidate;
use super::window::{RandomAccess, read_window};
use crate::extract::EventGrammar;

/// Returns the offset of the first event start after `candidate`.
///
/// The search covers one window of `window_size` bytes starting at the
/// candidate's timestamp. `None` means no event start was found there; the
/// caller must not guess an offset in that case.
pub fn resolve_cut<S, G>(
    store: &mut S,
    grammar: &G,
    candidate: &Candidate,
    window_size: usize,
) -> io::Result<Option<u64>>
where
    S: RandomAccess + ?Sized,
    G: EventGrammar + ?Sized,
{
    let file_len = store.len()?;
    if candidate.offset >= file_len {
        return Ok(None);
    }

    let span = (file_len - candidate.offset).min(window_size.max(1) as u64) as usize;
    let window = read_window(store, candidate.offset, span)?;

    Ok(grammar
        .next_event_start(&window, 0)
        .map(|offset| window.file_offset(offset)))
}
