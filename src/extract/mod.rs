//! Event boundary extraction, one grammar per export format.
//!
//! Each grammar looks at a raw [`Window`] of the output file and reports
//! where event timestamps sit inside it. Grammars never fail: bytes that do
//! not form a recognisable event (a torn tail, a fragment cut by the window
//! edge, plain garbage) are skipped and simply produce fewer boundaries.
//!
//! # Limitation
//!
//! Windows are examined independently. An event whose timestamp field is
//! cut by a window edge is not reported by either window, and an event
//! larger than a window is never reported at all.

pub mod delimited;
pub mod markup;
pub mod object;

pub use delimited::DelimitedGrammar;
pub use markup::MarkupGrammar;
pub use object::ObjectGrammar;

use crate::recovery::window::Window;
use crate::types::{ExportFormat, Timestamp};

/// A timestamp found in a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBoundary {
    /// The timestamp text, without quoting or markup.
    pub timestamp: Timestamp,
    /// Offset within the window that anchors the event: where the timestamp
    /// value begins for markup and object-notation, the record's first byte
    /// for delimited records.
    pub offset: usize,
}

impl EventBoundary {
    pub fn new(timestamp: Timestamp, offset: usize) -> Self {
        EventBoundary { timestamp, offset }
    }
}

/// Format-specific knowledge of where events and their timestamps are.
pub trait EventGrammar {
    /// Every complete timestamp in the window, in ascending offset order.
    fn boundaries(&self, window: &Window) -> Vec<EventBoundary>;

    /// Offset of the start of the event after the one anchored at `from`.
    ///
    /// `from` is a boundary offset; the event it belongs to is never
    /// returned. `None` when the window ends first.
    fn next_event_start(&self, window: &Window, from: usize) -> Option<usize>;

    /// Offset of the last event start in the window that has at least one
    /// byte of the event after it.
    fn last_event_start(&self, window: &Window) -> Option<usize>;
}

/// The grammar for a session's format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extractor {
    Delimited(DelimitedGrammar),
    Markup(MarkupGrammar),
    ObjectNotation(ObjectGrammar),
}

impl Extractor {
    /// Creates the grammar for `format` with default settings.
    pub fn for_format(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Delimited => Extractor::Delimited(DelimitedGrammar::default()),
            ExportFormat::Markup => Extractor::Markup(MarkupGrammar),
            ExportFormat::ObjectNotation => Extractor::ObjectNotation(ObjectGrammar),
        }
    }

    /// Creates the grammar for `format`, taking layout hints from the first
    /// bytes of the file.
    ///
    /// Only the delimited format uses the hint: its header line names the
    /// column that holds `_time`.
    pub fn for_file_head(format: ExportFormat, head: &[u8]) -> Self {
        match format {
            ExportFormat::Delimited => Extractor::Delimited(DelimitedGrammar::from_header(head)),
            other => Extractor::for_format(other),
        }
    }

    pub fn format(&self) -> ExportFormat {
        match self {
            Extractor::Delimited(_) => ExportFormat::Delimited,
            Extractor::Markup(_) => ExportFormat::Markup,
            Extractor::ObjectNotation(_) => ExportFormat::ObjectNotation,
        }
    }

    fn grammar(&self) -> &dyn EventGrammar {
        match self {
            Extractor::Delimited(g) => g,
            Extractor::Markup(g) => g,
            Extractor::ObjectNotation(g) => g,
        }
    }
}

impl EventGrammar for Extractor {
    fn boundaries(&self, window: &Window) -> Vec<EventBoundary> {
        self.grammar().boundaries(window)
    }

    fn next_event_start(&self, window: &Window, from: usize) -> Option<usize> {
        self.grammar().next_event_start(window, from)
    }

    fn last_event_start(&self, window: &Window) -> Option<usize> {
        self.grammar().last_event_start(window)
    }
}

/// Position of the first occurrence of `needle` in `haystack` at or after `from`.
pub(crate) fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}

/// Position of the last occurrence of `needle` in `haystack`.
pub(crate) fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_respects_from() {
        let hay = b"ab-ab-ab";
        assert_eq!(find(hay, b"ab", 0), Some(0));
        assert_eq!(find(hay, b"ab", 1), Some(3));
        assert_eq!(find(hay, b"ab", 7), None);
        assert_eq!(find(hay, b"ab", 100), None);
    }

    #[test]
    fn rfind_returns_last() {
        assert_eq!(rfind(b"ab-ab-ab", b"ab"), Some(6));
        assert_eq!(rfind(b"xyz", b"ab"), None);
        assert_eq!(rfind(b"a", b"ab"), None);
    }

    #[test]
    fn extractor_matches_format() {
        for format in ExportFormat::ALL {
            assert_eq!(Extractor::for_format(format).format(), format);
        }
    }

    #[test]
    fn file_head_sets_delimited_time_column() {
        let extractor = Extractor::for_file_head(ExportFormat::Delimited, b"\"_time\",\"user\"\n");
        assert_eq!(
            extractor,
            Extractor::Delimited(DelimitedGrammar::new(0, None))
        );
    }

    #[test]
    fn dispatch_reaches_the_format_grammar() {
        let window = Window::new(0, br#"{"_cd":"0:1","_time":"100","_raw":"a"}"#.to_vec());
        let extractor = Extractor::for_format(ExportFormat::ObjectNotation);
        let found = extractor.boundaries(&window);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].timestamp.as_str(), "100");
        assert_eq!(extractor.last_event_start(&window), Some(0));
    }
}
