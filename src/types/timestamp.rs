//! Event timestamps as they appear in the exported file.
//!
//! Timestamps are compared as strings. The exporter never needs to order
//! them itself: the data source guarantees descending delivery, and the
//! recovery scan only asks whether two timestamps are the same.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The raw text of an event's `_time` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub String);

impl Timestamp {
    pub fn new(s: impl Into<String>) -> Self {
        Timestamp(s.into())
    }

    /// Builds a timestamp from bytes taken out of a file window.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; such a timestamp can
    /// still be compared for equality with its neighbours.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Timestamp(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interprets the timestamp as a point in time. Delimited records use
    /// this to tell a time column from arbitrary text.
    ///
    /// Accepts the epoch-with-fraction form requested from the source
    /// (`1330000123.456`) and RFC 3339. Returns `None` for anything else.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let s = self.0.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }

        let (secs, frac) = s.split_once('.').unwrap_or((s, ""));
        let secs: i64 = secs.parse().ok()?;
        let nanos = if frac.is_empty() {
            0
        } else {
            if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            // Right-pad to nanoseconds: "456" -> 456_000_000
            let padded = format!("{:0<9}", frac);
            padded.parse().ok()?
        };
        DateTime::from_timestamp(secs, nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Timestamp {
    fn from(s: String) -> Self {
        Timestamp(s)
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Timestamp(s.to_string())
    }
}
