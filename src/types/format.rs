//! Output formats supported by the export.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The textual format the source streams and the output file holds.
///
/// The names on the wire (`csv`, `xml`, `json`) are the values the source
/// accepts as its `output_mode` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Delimited records, one event per record.
    #[serde(rename = "csv")]
    Delimited,
    /// Markup: one `<result>` element per event.
    #[serde(rename = "xml")]
    Markup,
    /// Object notation: one `{"_cd":...}` object per event.
    #[serde(rename = "json")]
    ObjectNotation,
}

/// Returned when parsing a format name that is not `csv`, `xml` or `json`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown export format: {0} (expected csv, xml or json)")]
pub struct UnknownFormat(pub String);

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [
        ExportFormat::Delimited,
        ExportFormat::Markup,
        ExportFormat::ObjectNotation,
    ];

    /// The `output_mode` value sent to the source.
    pub fn output_mode(&self) -> &'static str {
        match self {
            ExportFormat::Delimited => "csv",
            ExportFormat::Markup => "xml",
            ExportFormat::ObjectNotation => "json",
        }
    }

    /// Bytes that close a document of this format.
    ///
    /// Written after a truncated prefix when sealing is enabled, so the kept
    /// part of the file reads as a finished document before the resumed
    /// stream starts its own.
    pub fn document_terminator(&self) -> &'static [u8] {
        match self {
            ExportFormat::Delimited => b"\n",
            ExportFormat::Markup => b"\n</results>\n",
            ExportFormat::ObjectNotation => b"\n]\n",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.output_mode())
    }
}

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Delimited),
            "xml" => Ok(ExportFormat::Markup),
            "json" => Ok(ExportFormat::ObjectNotation),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}
