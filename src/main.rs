//! Index Export command line interface.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use index_export::source::CommandSource;
use index_export::types::{DEFAULT_INDEX, DEFAULT_OUTPUT_PATH};
use index_export::{ExportConfig, ExportFormat, ExportSession, Exporter};

/// Export a search index to a file, resuming interrupted exports.
#[derive(Parser, Debug)]
#[command(name = "index-export")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Index to export
    #[arg(default_value = DEFAULT_INDEX)]
    index: String,

    /// Output format: csv, xml or json
    #[arg(short, long, default_value = "csv")]
    format: ExportFormat,

    /// Resume from an existing output file instead of refusing it
    #[arg(short, long)]
    recover: bool,

    /// Output file path
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Search string (default: `search index=<INDEX> *`)
    #[arg(short, long)]
    search: Option<String>,

    /// Shell command that streams the export to stdout; request parameters
    /// arrive as EXPORT_* environment variables
    #[arg(long, env = "INDEX_EXPORT_SOURCE_CMD")]
    source_cmd: String,

    /// Bytes per recovery read
    #[arg(long)]
    window_size: Option<usize>,

    /// Bytes per copy step
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Close the kept prefix with the format's terminator before resuming
    #[arg(long)]
    seal: bool,
}

impl Cli {
    fn config(&self) -> ExportConfig {
        let mut config = ExportConfig::from_env();
        if let Some(window_size) = self.window_size {
            config = config.with_window_size(window_size);
        }
        if let Some(chunk_size) = self.chunk_size {
            config = config.with_chunk_size(chunk_size);
        }
        if self.seal {
            config = config.with_seal_resumed(true);
        }
        config
    }

    fn session(&self) -> ExportSession {
        let session = ExportSession::new(&self.index, self.format, &self.output)
            .with_recover(self.recover);
        match &self.search {
            Some(search) => session.with_search(search),
            None => session,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "index_export=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut exporter = Exporter::new(
        cli.session(),
        cli.config(),
        CommandSource::new(&cli.source_cmd),
    );

    let session = exporter.session();
    info!(
        index = session.index(),
        format = %session.format(),
        output = %session.output_path().display(),
        recover = session.recover(),
        source_cmd = exporter.source().command(),
        "Starting export"
    );

    match exporter.run() {
        Ok(summary) => match serde_json::to_string(&summary) {
            Ok(line) => {
                println!("{line}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: failed to render summary: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
