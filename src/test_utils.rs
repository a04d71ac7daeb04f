//! Shared test utilities and arbitrary generators for property-based testing.

use std::io::Cursor;
use std::ops::Range;

use proptest::prelude::*;

use crate::extract::{EventGrammar, Extractor};
use crate::recovery::Window;
use crate::source::{ExportRequest, ExportSource};
use crate::types::ExportFormat;

/// An exported event: its position in the stream, its time in
/// milliseconds since the epoch, and its raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub serial: u64,
    pub millis: u64,
    pub raw: String,
}

impl Event {
    pub fn new(serial: u64, millis: u64) -> Self {
        Event::with_raw(serial, millis, format!("event {serial}"))
    }

    pub fn with_raw(serial: u64, millis: u64, raw: impl Into<String>) -> Self {
        Event {
            serial,
            millis,
            raw: raw.into(),
        }
    }

    /// The `_time` text, in the source's `%s.%Q` format.
    pub fn time(&self) -> String {
        format!("{}.{:03}", self.millis / 1000, self.millis % 1000)
    }
}

/// Raw text with separators, quotes and line breaks.
///
/// No digits or underscores, so a continuation line never reads as a
/// delimited record and never contains an event marker.
pub fn arb_raw() -> impl Strategy<Value = String> {
    "[a-z ,\"\n]{0,12}"
}

/// Events in non-increasing time order, with runs of equal timestamps.
pub fn arb_events(len: Range<usize>) -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec((0u64..3, arb_raw()), len).prop_map(|steps| {
        let mut millis = 1_330_000_000_000u64;
        steps
            .into_iter()
            .enumerate()
            .map(|(serial, (step, raw))| {
                millis -= step * 250;
                Event::with_raw(serial as u64, millis, raw)
            })
            .collect()
    })
}

/// Quotes `value` as one delimited field.
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Renders `events` as a complete document in `format`, the way the source
/// streams it.
pub fn render(format: ExportFormat, events: &[Event]) -> Vec<u8> {
    let mut doc = String::new();
    match format {
        ExportFormat::Delimited => {
            doc.push_str("\"_serial\",\"_time\",\"_raw\"\n");
            for e in events {
                doc.push_str(&format!(
                    "{},{},{}\n",
                    e.serial,
                    quote_field(&e.time()),
                    quote_field(&e.raw)
                ));
            }
        }
        ExportFormat::Markup => {
            doc.push_str("<?xml version='1.0' encoding='UTF-8'?>\n<results preview='0'>\n");
            doc.push_str("<meta>\n<fieldOrder>\n<field>_cd</field>\n<field>_time</field>\n<field>_raw</field>\n</fieldOrder>\n</meta>\n");
            for e in events {
                doc.push_str(&format!(
                    "\t<result offset='{serial}'>\n\
                     \t\t<field k='_cd'>\n\t\t\t<value><text>0:{serial}</text></value>\n\t\t</field>\n\
                     \t\t<field k='_time'>\n\t\t\t<value><text>{time}</text></value>\n\t\t</field>\n\
                     \t\t<field k='_raw'><v xml:space='preserve' trunc='0'>{raw}</v></field>\n\
                     \t</result>\n",
                    serial = e.serial,
                    time = e.time(),
                    raw = e.raw
                ));
            }
            doc.push_str("</results>\n");
        }
        ExportFormat::ObjectNotation => {
            doc.push_str("[\n");
            let objects: Vec<String> = events
                .iter()
                .map(|e| {
                    format!(
                        "{{\"_cd\":\"0:{}\",\"_time\":\"{}\",\"_raw\":{}}}",
                        e.serial,
                        e.time(),
                        serde_json::Value::String(e.raw.clone())
                    )
                })
                .collect();
            doc.push_str(&objects.join(",\n"));
            doc.push_str("\n]\n");
        }
    }
    doc.into_bytes()
}

/// Every timestamp a grammar finds in `bytes`, read as one window.
pub fn timestamps_in(format: ExportFormat, bytes: &[u8]) -> Vec<String> {
    let grammar = Extractor::for_file_head(format, bytes);
    grammar
        .boundaries(&Window::new(0, bytes.to_vec()))
        .into_iter()
        .map(|b| b.timestamp.0)
        .collect()
}

/// A source that serves a fixed event list and records every request.
///
/// With a resume bound it serves the events from the first one carrying
/// that timestamp onward, like a descending query with an inclusive upper
/// time bound.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    pub format: ExportFormat,
    pub events: Vec<Event>,
    pub requests: Vec<ExportRequest>,
}

impl ScriptedSource {
    pub fn new(format: ExportFormat, events: Vec<Event>) -> Self {
        ScriptedSource {
            format,
            events,
            requests: Vec::new(),
        }
    }
}

impl ExportSource for ScriptedSource {
    type Stream = Cursor<Vec<u8>>;

    fn open(&mut self, request: &ExportRequest) -> crate::source::Result<Self::Stream> {
        self.requests.push(request.clone());
        let served: Vec<Event> = match &request.latest_time {
            Some(bound) => self
                .events
                .iter()
                .skip_while(|e| e.time() != bound.as_str())
                .cloned()
                .collect(),
            None => self.events.clone(),
        };
        Ok(Cursor::new(render(self.format, &served)))
    }
}
