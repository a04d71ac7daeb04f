//! Export request parameters.

use serde::Serialize;

use crate::types::{ExportFormat, ExportSession, Timestamp};

/// Lower time bound for every export: the whole index.
pub const EARLIEST_TIME: &str = "0.000";

/// Event time format: epoch seconds with milliseconds.
pub const TIME_FORMAT: &str = "%s.%Q";

/// Search timeout handed to the service, in seconds.
pub const SEARCH_TIMEOUT_SECS: u64 = 60;

/// The parameters of one export stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    pub search: String,
    pub format: ExportFormat,
    pub earliest_time: String,
    /// Inclusive upper time bound. Events arrive newest first, so this is
    /// where a resumed export picks up.
    pub latest_time: Option<Timestamp>,
    pub time_format: String,
    pub timeout_secs: u64,
}

impl ExportRequest {
    /// Builds the request for `session`, resuming from `resume_from` if set.
    pub fn for_session(session: &ExportSession, resume_from: Option<Timestamp>) -> Self {
        ExportRequest {
            search: session.search(),
            format: session.format(),
            earliest_time: EARLIEST_TIME.to_string(),
            latest_time: resume_from,
            time_format: TIME_FORMAT.to_string(),
            timeout_secs: SEARCH_TIMEOUT_SECS,
        }
    }

    pub fn is_resume(&self) -> bool {
        self.latest_time.is_some()
    }

    /// Key/value pairs as the search service names them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("search", self.search.clone()),
            ("output_mode", self.format.output_mode().to_string()),
            ("earliest_time", self.earliest_time.clone()),
        ];
        if let Some(latest) = &self.latest_time {
            params.push(("latest_time", latest.to_string()));
        }
        params.push(("time_format", self.time_format.clone()));
        params.push(("timeout", self.timeout_secs.to_string()));
        params
    }
}
