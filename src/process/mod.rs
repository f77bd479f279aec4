//! Child process execution with streamed output and cancellation.
//!
//! The runner never goes through a shell: the argument list is handed to the
//! program verbatim. Every line the child writes is forwarded to the log sink
//! as it arrives, and the call settles on exit, on failure to spawn, or when
//! the cancellation token fires (in which case the child is killed). The sink
//! also gets one outcome line per call: `exit <code>`, `killed by signal`,
//! `failed to start: <err>` or `cancel command`.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::{CancelledError, ProcessError};
use crate::output::LogSink;

/// stderr lines starting with this token are benign and kept out of errors.
const WARNING_PREFIX: &str = "WARNING";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and return everything it wrote to stdout.
    ///
    /// Fails with [`ProcessError`] on a nonzero exit and with
    /// [`CancelledError`] when `cancel` fires first.
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Clone)]
pub struct ProcessRunner {
    sink: Arc<dyn LogSink>,
}

impl ProcessRunner {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    #[tracing::instrument(skip(self, cancel))]
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<String> {
        let sink = self.sink.as_ref();
        sink.append_line(&format!("exec {} {}", program.display(), args.join(" ")));

        if cancel.is_cancelled() {
            sink.append_line("cancel command");
            return Err(CancelledError.into());
        }

        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                sink.append_line(&format!("failed to start: {}", e));
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to start {}", program.display())));
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut stdout_text = String::new();
        let mut stderr_text = String::new();

        let finished = tokio::select! {
            status = async {
                let (out, err) = tokio::join!(
                    drain_lines(stdout, |line| {
                        sink.append_line(line);
                        stdout_text.push_str(line);
                        stdout_text.push('\n');
                    }),
                    drain_lines(stderr, |line| {
                        sink.append_line(line);
                        if !line.starts_with(WARNING_PREFIX) {
                            stderr_text.push_str(line);
                            stderr_text.push('\n');
                        }
                    }),
                );
                match out.and(err) {
                    Ok(()) => child.wait().await.context("Failed to wait for process"),
                    Err(e) => Err(e),
                }
            } => Some(status),
            _ = cancel.cancelled() => None,
        };

        let Some(status) = finished else {
            sink.append_line("cancel command");
            if let Err(e) = child.kill().await {
                debug!("Failed to kill {}: {}", program.display(), e);
            }
            return Err(CancelledError.into());
        };

        let status = status?;
        match status.code() {
            Some(code) => sink.append_line(&format!("exit {}", code)),
            None => sink.append_line("killed by signal"),
        }
        sink.append_line("");

        if status.success() {
            debug!("{} exited successfully", program.display());
            Ok(stdout_text)
        } else {
            debug!("{} failed with {:?}", program.display(), status.code());
            Err(ProcessError {
                exit_code: status.code(),
                stderr: stderr_text,
            }
            .into())
        }
    }
}

/// Read `reader` line by line until EOF, handing each line (without its
/// terminator) to `on_line`. Invalid UTF-8 is replaced, not rejected.
async fn drain_lines<R, F>(reader: Option<R>, mut on_line: F) -> Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let Some(reader) = reader else {
        return Ok(());
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("Failed to read process output")?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\r', '\n']));
    }
    Ok(())
}
