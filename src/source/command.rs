//! Export streams read from an external command.
//!
//! The command runs under `sh -c` with the request parameters in its
//! environment as `EXPORT_<KEY>` (for example `EXPORT_LATEST_TIME`). Its
//! stdout is the export stream. A non-zero exit surfaces as a read error at
//! the end of the stream, so a failed export is never mistaken for a
//! complete one.

use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use super::{ExportRequest, ExportSource, Result, SourceError};

/// Runs a shell command per export.
#[derive(Debug, Clone)]
pub struct CommandSource {
    command: String,
}

impl CommandSource {
    pub fn new(command: impl Into<String>) -> Self {
        CommandSource {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn build(&self, request: &ExportRequest) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        for (key, value) in request.params() {
            cmd.env(format!("EXPORT_{}", key.to_ascii_uppercase()), value);
        }
        cmd
    }
}

impl ExportSource for CommandSource {
    type Stream = CommandStream;

    fn open(&mut self, request: &ExportRequest) -> Result<CommandStream> {
        let mut child = self
            .build(request)
            .spawn()
            .map_err(|source| SourceError::Spawn {
                command: self.command.clone(),
                source,
            })?;
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SourceError::NoStdout {
                command: self.command.clone(),
            });
        };
        debug!(command = %self.command, pid = child.id(), "Started source command");
        Ok(CommandStream {
            child,
            stdout,
            command: self.command.clone(),
            finished: false,
        })
    }
}

/// Stdout of a running source command.
#[derive(Debug)]
pub struct CommandStream {
    child: Child,
    stdout: ChildStdout,
    command: String,
    finished: bool,
}

impl CommandStream {
    fn finish(&mut self) -> io::Result<()> {
        let status = self.child.wait()?;
        self.finished = true;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "source command `{}` exited with {status}",
                self.command
            )))
        }
    }
}

impl Read for CommandStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }
        let n = self.stdout.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.finish()?;
        }
        Ok(n)
    }
}

impl Drop for CommandStream {
    fn drop(&mut self) {
        if !self.finished {
            warn!(command = %self.command, "Source stream dropped early, killing command");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
