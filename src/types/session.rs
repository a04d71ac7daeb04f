//! The parameters of one export invocation.

use std::path::{Path, PathBuf};

use super::format::ExportFormat;

/// Index exported when none is named.
pub const DEFAULT_INDEX: &str = "main";

/// Output file used when none is named.
pub const DEFAULT_OUTPUT_PATH: &str = "export.out";

/// What to export, where, and whether a previous run may be resumed.
///
/// Built once per invocation and not changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSession {
    index: String,
    search: Option<String>,
    format: ExportFormat,
    output_path: PathBuf,
    recover: bool,
}

impl ExportSession {
    /// Creates a session exporting `index` in `format` to `output_path`,
    /// with recovery disabled.
    pub fn new(
        index: impl Into<String>,
        format: ExportFormat,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        ExportSession {
            index: index.into(),
            search: None,
            format,
            output_path: output_path.into(),
            recover: false,
        }
    }

    /// Allows resuming from an existing output file.
    pub fn with_recover(mut self, recover: bool) -> Self {
        self.recover = recover;
        self
    }

    /// Replaces the default `search index=<index> *` query.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn recover(&self) -> bool {
        self.recover
    }

    /// The search string sent to the source.
    pub fn search(&self) -> String {
        match &self.search {
            Some(search) => search.clone(),
            None => format!("search index={} *", self.index),
        }
    }
}
