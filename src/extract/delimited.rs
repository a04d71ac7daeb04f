//! Delimited (CSV) export grammar.
//!
//! One record per event. The source's default field order puts an integer
//! serial first and the time second:
//!
//! ```text
//! "_serial","_time","source","_raw"
//! 0,"1330000124.000","access.log","GET /"
//! 1,"1330000123.000","access.log","stack trace:
//! at main()"
//! ```
//!
//! Records are read with the `csv` reader, so quoted fields may hold commas,
//! doubled quotes and newlines. A record's boundary offset is its first
//! byte.
//!
//! # Valid records
//!
//! A record is an event when its serial column (if the layout has one)
//! holds an unsigned integer and its time column parses as a timestamp:
//! epoch seconds with an optional fraction (`%s.%Q`), or RFC 3339. Header
//! records (the time column holds `_time`) and blank lines are skipped;
//! both appear mid-file when a resumed stream was appended verbatim. Any
//! other complete record is invalid.
//!
//! # Synchronising
//!
//! A window that does not start the file may start inside a record, even
//! inside a quoted multi-line value. Parsing is tried from each line start
//! in turn, and the first start from which no complete record is invalid
//! wins. The continuation lines of a quoted value do not parse as events,
//! so they are never mistaken for records of their own.
//!
//! # Completeness
//!
//! A record counts only when the reader finds its terminator inside the
//! window. A record cut by the window edge or by a crash is torn: it marks
//! an event start but yields no timestamp.

use std::io::{Chain, Read};

use csv::{ByteRecord, Reader, ReaderBuilder};

use super::{EventBoundary, EventGrammar};
use crate::recovery::window::Window;
use crate::types::Timestamp;

/// Name of the timestamp column in the header line.
pub const TIME_FIELD: &str = "_time";

/// Name of the serial column in the header line.
pub const SERIAL_FIELD: &str = "_serial";

/// Column holding `_time` when the file has no usable header.
pub const DEFAULT_TIME_COLUMN: usize = 1;

/// Column holding `_serial` when the file has no usable header.
pub const DEFAULT_SERIAL_COLUMN: usize = 0;

/// Fed to the reader after the window bytes. A record ending on the
/// window's last byte then ends before it, and a record cut by the window
/// edge runs into it.
const SENTINEL: &[u8] = b"\0";

/// Grammar for delimited records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedGrammar {
    time_column: usize,
    serial_column: Option<usize>,
}

impl Default for DelimitedGrammar {
    fn default() -> Self {
        DelimitedGrammar::new(DEFAULT_TIME_COLUMN, Some(DEFAULT_SERIAL_COLUMN))
    }
}

impl DelimitedGrammar {
    pub fn new(time_column: usize, serial_column: Option<usize>) -> Self {
        DelimitedGrammar {
            time_column,
            serial_column,
        }
    }

    /// Takes the column layout from a header record at the start of `head`.
    ///
    /// Falls back to the default layout when the first record is torn or
    /// does not name `_time`. A header without `_serial` disables the
    /// serial check.
    pub fn from_header(head: &[u8]) -> Self {
        let Some(header) = Records::new(head, 0).next().filter(|r| r.complete) else {
            return DelimitedGrammar::default();
        };
        let column = |name: &str| header.fields.iter().position(|f| f == name.as_bytes());
        match column(TIME_FIELD) {
            Some(time) => DelimitedGrammar::new(time, column(SERIAL_FIELD)),
            None => DelimitedGrammar::default(),
        }
    }

    pub fn time_column(&self) -> usize {
        self.time_column
    }

    pub fn serial_column(&self) -> Option<usize> {
        self.serial_column
    }

    fn classify(&self, fields: &ByteRecord) -> Kind {
        if fields.len() == 1 && fields[0].is_empty() {
            return Kind::Skipped;
        }
        let Some(time) = fields.get(self.time_column) else {
            return Kind::Invalid;
        };
        if time == TIME_FIELD.as_bytes() {
            return Kind::Skipped;
        }
        if let Some(column) = self.serial_column {
            match fields.get(column) {
                Some(serial) if !serial.is_empty() && serial.iter().all(u8::is_ascii_digit) => {}
                _ => return Kind::Invalid,
            }
        }
        let timestamp = Timestamp::from_bytes(time);
        if timestamp.to_datetime().is_some() {
            Kind::Event(timestamp)
        } else {
            Kind::Invalid
        }
    }

    /// Events and torn records of the window, from the first line start
    /// that parses cleanly.
    fn parse(&self, window: &Window) -> Vec<Entry> {
        let bytes = window.bytes();
        let file_start = window.is_at_file_start().then_some(0);
        let line_starts = bytes
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == b'\n')
            .map(|(i, _)| i + 1);

        for base in file_start.into_iter().chain(line_starts) {
            if base >= bytes.len() {
                break;
            }
            if let Some(entries) = self.parse_from(bytes, base) {
                return entries;
            }
        }
        Vec::new()
    }

    /// `None` if a complete record from `base` on is invalid.
    fn parse_from(&self, bytes: &[u8], base: usize) -> Option<Vec<Entry>> {
        let mut entries = Vec::new();
        for record in Records::new(bytes, base) {
            if !record.complete {
                entries.push(Entry {
                    start: record.start,
                    timestamp: None,
                });
                continue;
            }
            match self.classify(&record.fields) {
                Kind::Event(timestamp) => entries.push(Entry {
                    start: record.start,
                    timestamp: Some(timestamp),
                }),
                Kind::Skipped => {}
                Kind::Invalid => return None,
            }
        }
        Some(entries)
    }
}

impl EventGrammar for DelimitedGrammar {
    fn boundaries(&self, window: &Window) -> Vec<EventBoundary> {
        self.parse(window)
            .into_iter()
            .filter_map(|entry| Some(EventBoundary::new(entry.timestamp?, entry.start)))
            .collect()
    }

    /// End of the record starting at `from`, if the window holds all of it.
    fn next_event_start(&self, window: &Window, from: usize) -> Option<usize> {
        Records::new(window.bytes(), from)
            .next()
            .filter(|record| record.complete)
            .map(|record| record.end)
    }

    fn last_event_start(&self, window: &Window) -> Option<usize> {
        self.parse(window).last().map(|entry| entry.start)
    }
}

enum Kind {
    Event(Timestamp),
    /// Header or blank record.
    Skipped,
    Invalid,
}

/// An event record, or a torn one (no timestamp).
#[derive(Debug)]
struct Entry {
    start: usize,
    timestamp: Option<Timestamp>,
}

/// A record as the reader saw it. Offsets are window offsets.
#[derive(Debug)]
struct RawRecord {
    start: usize,
    /// Just past the record terminator.
    end: usize,
    complete: bool,
    fields: ByteRecord,
}

/// Records of `bytes` starting at `base`.
struct Records<'a> {
    bytes: &'a [u8],
    base: usize,
    reader: Reader<Chain<&'a [u8], &'static [u8]>>,
}

impl<'a> Records<'a> {
    fn new(bytes: &'a [u8], base: usize) -> Self {
        let base = base.min(bytes.len());
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes[base..].chain(SENTINEL));
        Records {
            bytes,
            base,
            reader,
        }
    }
}

impl Iterator for Records<'_> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        let mut fields = ByteRecord::new();
        if !self.reader.read_byte_record(&mut fields).ok()? {
            return None;
        }

        let len = self.bytes.len();
        // The reader places a record at the first byte after the previous
        // one, which may be a line terminator it skipped.
        let mut start = self.base + fields.position().map_or(0, |p| p.byte() as usize);
        while start < len && matches!(self.bytes[start], b'\r' | b'\n') {
            start += 1;
        }
        if start >= len {
            // Only the sentinel was left.
            return None;
        }

        let mut end = self.base + self.reader.position().byte() as usize;
        let complete = end <= len;
        if complete && end < len && self.bytes[end - 1] == b'\r' && self.bytes[end] == b'\n' {
            end += 1;
        }

        Some(RawRecord {
            start,
            end: end.min(len),
            complete,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(grammar: &DelimitedGrammar, window: &Window) -> Vec<String> {
        grammar
            .boundaries(window)
            .into_iter()
            .map(|b| b.timestamp.0)
            .collect()
    }

    fn window(bytes: &str) -> Window {
        Window::new(0, bytes.as_bytes().to_vec())
    }

    // ─── Layout ───

    #[test]
    fn reads_second_column_by_default() {
        let grammar = DelimitedGrammar::default();
        let w = window("0,\"200.000\",\"a\"\n1,\"199.000\",\"b\"\n");
        assert_eq!(times(&grammar, &w), vec!["200.000", "199.000"]);
    }

    #[test]
    fn offset_points_at_record_start() {
        let doc = "0,\"200.000\",\"a\"\n1,\"199.000\",\"b\"\n";
        let found = DelimitedGrammar::default().boundaries(&window(doc));
        assert_eq!(found[0].offset, 0);
        assert_eq!(&doc[found[1].offset..found[1].offset + 2], "1,");
    }

    #[test]
    fn header_sets_columns() {
        let grammar = DelimitedGrammar::from_header(b"\"_serial\",\"_time\",\"_raw\"\n");
        assert_eq!(grammar, DelimitedGrammar::default());

        let doc = "\"_time\",\"user\"\n\"2020-01-01T00:00:01Z\",\"bob\"\n";
        let grammar = DelimitedGrammar::from_header(doc.as_bytes());
        assert_eq!(grammar.time_column(), 0);
        assert_eq!(grammar.serial_column(), None);
        assert_eq!(times(&grammar, &window(doc)), vec!["2020-01-01T00:00:01Z"]);
    }

    #[test]
    fn header_without_time_column_keeps_default() {
        let grammar = DelimitedGrammar::from_header(b"\"a\",\"b\",\"c\"\n");
        assert_eq!(grammar, DelimitedGrammar::default());
        let grammar = DelimitedGrammar::from_header(b"\"_serial\",\"_ti");
        assert_eq!(grammar, DelimitedGrammar::default());
        let grammar = DelimitedGrammar::from_header(b"");
        assert_eq!(grammar, DelimitedGrammar::default());
    }

    #[test]
    fn repeated_headers_and_blank_lines_are_skipped() {
        let doc = "\"_serial\",\"_time\",\"_raw\"\n0,\"200.000\",\"a\"\n\n\"_serial\",\"_time\",\"_raw\"\n1,\"199.000\",\"b\"\n";
        let grammar = DelimitedGrammar::from_header(doc.as_bytes());
        assert_eq!(times(&grammar, &window(doc)), vec!["200.000", "199.000"]);
    }

    // ─── Quoting ───

    #[test]
    fn quoted_commas_and_quotes_stay_in_their_field() {
        let grammar = DelimitedGrammar::default();
        let w = window("0,\"200.000\",\"a,b \"\"c\"\"\"\n1,\"199.000\",\"d\"\n");
        assert_eq!(times(&grammar, &w), vec!["200.000", "199.000"]);
    }

    #[test]
    fn multi_line_value_is_one_record() {
        let grammar = DelimitedGrammar::default();
        let w = window("0,\"200.000\",\"first\n7,\"\"100.000\"\",x\"\n1,\"199.000\",\"b\"\n");
        assert_eq!(times(&grammar, &w), vec!["200.000", "199.000"]);
    }

    #[test]
    fn window_starting_inside_quoted_value_syncs_on_next_record() {
        let grammar = DelimitedGrammar::default();
        let w = Window::new(40, b"ond\nnext,bogus,tail\"\n2,\"198.000\",\"x\"\n".to_vec());
        let found = grammar.boundaries(&w);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].timestamp.as_str(), "198.000");
        assert_eq!(found[0].offset, 21);
    }

    #[test]
    fn first_line_of_inner_window_is_skipped() {
        let grammar = DelimitedGrammar::default();
        let w = Window::new(10, b"0,\"200.000\",\"a\"\n1,\"199.000\",\"b\"\n".to_vec());
        assert_eq!(times(&grammar, &w), vec!["199.000"]);

        let no_newline = Window::new(10, b"0,\"200.000\",\"a\"".to_vec());
        assert!(grammar.boundaries(&no_newline).is_empty());
        assert_eq!(grammar.last_event_start(&no_newline), None);
    }

    // ─── Validation ───

    #[test]
    fn serial_must_be_an_integer() {
        let grammar = DelimitedGrammar::default();
        assert!(grammar.boundaries(&window("x,\"200.000\",\"a\"\n")).is_empty());
        assert!(grammar.boundaries(&window(",\"200.000\",\"a\"\n")).is_empty());
    }

    #[test]
    fn time_must_parse() {
        let grammar = DelimitedGrammar::default();
        assert!(grammar.boundaries(&window("0,\"soon\",\"a\"\n")).is_empty());
        assert!(grammar.boundaries(&window("0,\"200.0x\",\"a\"\n")).is_empty());
    }

    #[test]
    fn garbage_yields_nothing() {
        let grammar = DelimitedGrammar::default();
        let w = Window::new(0, b"\x00\x01garbage\nmore garbage".to_vec());
        assert!(grammar.boundaries(&w).is_empty());
    }

    // ─── Torn records ───

    #[test]
    fn torn_record_has_no_timestamp() {
        let grammar = DelimitedGrammar::default();
        let w = window("0,\"200.000\",\"a\"\n1,\"199.0");
        assert_eq!(times(&grammar, &w), vec!["200.000"]);
        assert_eq!(grammar.last_event_start(&w), Some(16));

        // A complete time field does not make a torn record whole.
        let w = window("0,\"200.000\",\"a\"\n1,\"199.000\",\"b");
        assert_eq!(times(&grammar, &w), vec!["200.000"]);
        assert_eq!(grammar.last_event_start(&w), Some(16));
    }

    #[test]
    fn torn_inside_quoted_newline() {
        let grammar = DelimitedGrammar::default();
        let doc = "0,\"200.000\",\"a\"\n1,\"199.000\",\"first\nnext,bo";
        let w = window(doc);
        assert_eq!(times(&grammar, &w), vec!["200.000"]);
        assert_eq!(grammar.last_event_start(&w), Some(16));

        let doc = "0,\"200.000\",\"a\"\n1,\"199.000\",\"first\n";
        assert_eq!(times(&grammar, &window(doc)), vec!["200.000"]);
    }

    #[test]
    fn record_ending_at_window_end_is_complete() {
        let grammar = DelimitedGrammar::default();
        let w = window("0,\"200.000\",\"a\"\n");
        assert_eq!(times(&grammar, &w), vec!["200.000"]);
        assert_eq!(grammar.last_event_start(&w), Some(0));
    }

    #[test]
    fn crlf_line_endings() {
        let grammar = DelimitedGrammar::default();
        let w = window("0,\"200.000\"\r\n1,\"199.000\"\r\n");
        assert_eq!(times(&grammar, &w), vec!["200.000", "199.000"]);
        assert_eq!(grammar.next_event_start(&w, 0), Some(13));
    }

    // ─── Record ends ───

    #[test]
    fn next_event_start_is_record_end() {
        let grammar = DelimitedGrammar::default();
        let w = window("0,\"200.000\",\"a\"\n1,\"199.000\",\"b\"\n");
        assert_eq!(grammar.next_event_start(&w, 0), Some(16));
        assert_eq!(grammar.next_event_start(&w, 16), Some(32));
    }

    #[test]
    fn next_event_start_spans_quoted_newlines() {
        let grammar = DelimitedGrammar::default();
        let doc = "0,\"200.000\",\"x\ny\"\n1,\"199.000\",\"b\"\n";
        assert_eq!(grammar.next_event_start(&window(doc), 0), Some(18));
    }

    #[test]
    fn next_event_start_needs_a_terminator() {
        let grammar = DelimitedGrammar::default();
        assert_eq!(grammar.next_event_start(&window("0,\"200.000\""), 0), None);
        assert_eq!(
            grammar.next_event_start(&window("0,\"200.000\",\"open\n"), 0),
            None
        );
    }
}
