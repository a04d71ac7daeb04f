//! Object-notation (JSON) export grammar.
//!
//! Events are flat objects, each opening with the `_cd` member:
//!
//! ```text
//! [
//! {"_cd":"0:1","_time":"1330000124.000","_raw":"GET /"},
//! {"_cd":"0:2","_time":"1330000123.000","_raw":"GET /favicon.ico"}
//! ]
//! ```

use super::{EventBoundary, EventGrammar, find, rfind};
use crate::recovery::window::Window;
use crate::types::Timestamp;

/// Opens every event object.
pub const EVENT_OPEN: &[u8] = b"{\"_cd\":";

/// Precedes the timestamp value.
pub const TIME_MARKER: &[u8] = b"\"_time\":\"";

/// Grammar for streams of `{"_cd":...}` objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectGrammar;

impl EventGrammar for ObjectGrammar {
    fn boundaries(&self, window: &Window) -> Vec<EventBoundary> {
        let bytes = window.bytes();
        let mut found = Vec::new();
        let mut pos = 0;

        while let Some(marker) = find(bytes, TIME_MARKER, pos) {
            let start = marker + TIME_MARKER.len();
            let Some(quote) = find(bytes, b"\"", start) else {
                break;
            };
            // The value is complete once its closing quote is followed by the
            // next member or the end of the object.
            match bytes.get(quote + 1) {
                Some(b',') | Some(b'}') => {
                    if quote > start {
                        found.push(EventBoundary::new(
                            Timestamp::from_bytes(&bytes[start..quote]),
                            start,
                        ));
                    }
                }
                None => break,
                Some(_) => {}
            }
            pos = quote + 1;
        }

        found
    }

    fn next_event_start(&self, window: &Window, from: usize) -> Option<usize> {
        find(window.bytes(), EVENT_OPEN, from)
    }

    fn last_event_start(&self, window: &Window) -> Option<usize> {
        rfind(window.bytes(), EVENT_OPEN)
    }
}
