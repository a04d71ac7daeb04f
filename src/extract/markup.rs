//! Markup (XML) export grammar.
//!
//! Events are `<result>` elements; the timestamp is the text of the
//! `_time` field's value:
//!
//! ```text
//! <result offset='0'>
//!     <field k='_time'>
//!         <value><text>1330000124.000</text></value>
//!     </field>
//! </result>
//! ```

use super::{EventBoundary, EventGrammar, find, rfind};
use crate::recovery::window::Window;
use crate::types::Timestamp;

/// Opens every event element.
pub const EVENT_OPEN: &[u8] = b"<result offset=";

/// Opens the timestamp field.
pub const TIME_FIELD_OPEN: &[u8] = b"<field k='_time'>";

/// Opens the value nested in a field.
pub const VALUE_OPEN: &[u8] = b"<value>";

/// Grammar for `<result>` element streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkupGrammar;

impl EventGrammar for MarkupGrammar {
    fn boundaries(&self, window: &Window) -> Vec<EventBoundary> {
        let bytes = window.bytes();
        let mut found = Vec::new();
        let mut pos = 0;

        while let Some(field) = find(bytes, TIME_FIELD_OPEN, pos) {
            let Some(value) = find(bytes, VALUE_OPEN, field + TIME_FIELD_OPEN.len()) else {
                break;
            };
            let mut start = value + VALUE_OPEN.len();
            while bytes.get(start).is_some_and(|b| b.is_ascii_whitespace()) {
                start += 1;
            }

            // Skip the child element's open tag, e.g. `<text>`.
            if bytes.get(start) == Some(&b'<') {
                if bytes.get(start + 1) == Some(&b'/') {
                    // Empty value.
                    pos = start;
                    continue;
                }
                let Some(tag_end) = find(bytes, b">", start) else {
                    break;
                };
                start = tag_end + 1;
            }

            let Some(end) = find(bytes, b"<", start) else {
                break;
            };
            match bytes.get(end + 1) {
                Some(b'/') => {
                    if end > start {
                        found.push(EventBoundary::new(
                            Timestamp::from_bytes(&bytes[start..end]),
                            start,
                        ));
                    }
                }
                None => break,
                Some(_) => {}
            }
            pos = end;
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
