//! Output preparation and the export run.
//!
//! # State Machine
//!
//! ```text
//! CHECK_FILE ─┬─ missing ──────────────► create ──────────────┐
//!             ├─ empty, no recover ────► proceed ─────────────┤
//!             ├─ non-empty, no recover ► ExistingOutput (fatal)│
//!             └─ recover ──► SCAN ─┬─ found ► truncate, resume ┤
//!                                  └─ none ─► truncate to 0 ───┤
//!                                                              ▼
//!                                                    STREAM ─► DONE
//! ```
//!
//! Every transition is taken once. There are no retries: a failed run is
//! repaired by the next run with `recover`.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::stream::copy_stream;
use super::{ExportError, Result};
use crate::config::ExportConfig;
use crate::extract::Extractor;
use crate::persistence::{OutputError, OutputFile, OutputState, inspect};
use crate::recovery::{RecoveryDecision, RestartReason, plan_recovery, read_window};
use crate::source::{ExportRequest, ExportSource};
use crate::types::{ExportFormat, ExportSession, Timestamp};

/// An output file ready to receive the stream.
#[derive(Debug)]
pub struct PreparedOutput {
    pub file: OutputFile,
    pub decision: RecoveryDecision,
    /// Set when recovery fell back to starting over.
    pub restart_reason: Option<RestartReason>,
    /// Bytes dropped from the end of the file.
    pub truncated_bytes: u64,
    /// Recovery windows read.
    pub windows_read: u64,
}

impl PreparedOutput {
    fn fresh(file: OutputFile) -> Self {
        PreparedOutput {
            file,
            decision: RecoveryDecision::restart(),
            restart_reason: None,
            truncated_bytes: 0,
            windows_read: 0,
        }
    }
}

/// Checks the output path and brings the file into a state the stream can
/// be appended to.
///
/// Fails with [`ExportError::ExistingOutput`] before touching anything when
/// the file has content and `session.recover()` is off.
pub fn prepare_output(session: &ExportSession, config: &ExportConfig) -> Result<PreparedOutput> {
    let path = session.output_path();
    let state = inspect(path)?;
    debug!(path = %path.display(), ?state, recover = session.recover(), "Checked output file");

    match (state, session.recover()) {
        (OutputState::Missing, _) => {
            info!(path = %path.display(), "Creating output file");
            Ok(PreparedOutput::fresh(OutputFile::create(path)?))
        }
        (OutputState::Empty, false) => Ok(PreparedOutput::fresh(OutputFile::open_existing(path)?)),
        (OutputState::NonEmpty(_), false) => Err(ExportError::ExistingOutput {
            path: path.to_path_buf(),
        }),
        (_, true) => recover_output(path, session.format(), config.window_size),
    }
}

fn recover_output(path: &Path, format: ExportFormat, window_size: usize) -> Result<PreparedOutput> {
    let mut file = OutputFile::open_existing(path)?;
    let io_err = |source: io::Error| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    let len = file.len()?;
    let head = read_window(&mut file, 0, window_size).map_err(io_err)?;
    let grammar = Extractor::for_file_head(format, head.bytes());
    let plan = plan_recovery(&mut file, &grammar, window_size).map_err(io_err)?;

    let cut = plan.decision.truncate_to;
    if cut < len {
        file.truncate(cut)?;
    }

    match (&plan.decision.resume_from, plan.restart_reason) {
        (Some(ts), _) => info!(
            path = %path.display(),
            resume_from = %ts,
            resume_at = ?ts.to_datetime().map(|t| t.to_rfc3339()),
            kept = cut,
            dropped = len - cut,
            "Recovered output file, resuming export"
        ),
        (None, Some(RestartReason::EmptyFile)) => {
            debug!(path = %path.display(), "Output file is empty, starting export")
        }
        (None, reason) => warn!(
            path = %path.display(),
            reason = %reason.map(|r| r.to_string()).unwrap_or_default(),
            dropped = len,
            "Could not recover output file, restarting export"
        ),
    }

    Ok(PreparedOutput {
        file,
        decision: plan.decision,
        restart_reason: plan.restart_reason,
        truncated_bytes: len - cut.min(len),
        windows_read: plan.windows_read,
    })
}

/// What an export run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub index: String,
    pub format: ExportFormat,
    pub output_path: PathBuf,
    pub decision: RecoveryDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_reason: Option<RestartReason>,
    pub truncated_bytes: u64,
    pub windows_read: u64,
    /// Whether the document terminator was appended before resuming.
    pub sealed: bool,
    /// Stream bytes appended (not counting the terminator).
    pub bytes_written: u64,
    pub finished_at: DateTime<Utc>,
}

impl ExportSummary {
    pub fn resumed_from(&self) -> Option<&Timestamp> {
        self.decision.resume_from.as_ref()
    }
}

/// Runs one export of a session against a source.
#[derive(Debug)]
pub struct Exporter<S> {
    session: ExportSession,
    config: ExportConfig,
    source: S,
}

impl<S: ExportSource> Exporter<S> {
    pub fn new(session: ExportSession, config: ExportConfig, source: S) -> Self {
        Exporter {
            session,
            config,
            source,
        }
    }

    pub fn session(&self) -> &ExportSession {
        &self.session
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Prepares the output file, then streams the export into it.
    #[instrument(
        skip(self),
        fields(index = %self.session.index(), format = %self.session.format())
    )]
    pub fn run(&mut self) -> Result<ExportSummary> {
        let PreparedOutput {
            mut file,
            decision,
            restart_reason,
            truncated_bytes,
            windows_read,
        } = prepare_output(&self.session, &self.config)?;

        let sealed = decision.resume_from.is_some() && self.config.seal_resumed;
        if sealed {
            file.append(self.session.format().document_terminator())?;
            debug!("Sealed kept prefix");
        }

        let request = ExportRequest::for_session(&self.session, decision.resume_from.clone());
        let stream = self.source.open(&request)?;
        let bytes_written = self.stream_into(stream, &mut file)?;
        file.sync()?;

        info!(
            path = %file.path().display(),
            bytes_written,
            resumed = request.is_resume(),
            "Export complete"
        );

        Ok(ExportSummary {
            index: self.session.index().to_string(),
            format: self.session.format(),
            output_path: file.path().to_path_buf(),
            decision,
            restart_reason,
            truncated_bytes,
            windows_read,
            sealed,
            bytes_written,
            finished_at: Utc::now(),
        })
    }

    fn stream_into(&self, stream: impl Read, file: &mut OutputFile) -> Result<u64> {
        match copy_stream(stream, file, self.config.chunk_size) {
            Ok(n) => Ok(n),
            Err(e) => {
                if let Err(sync_err) = file.sync() {
                    warn!(error = %sync_err, "Failed to sync output after stream error");
                }
                warn!(written = e.written(), error = %e, "Export stream failed");
                Err(e.into())
            }
        }
    }
}
