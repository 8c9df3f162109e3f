//! Streaming command runner: stdout feeds a transcript session

use super::session::TranscriptSession;
use super::types::{StreamSource, StreamingOutput};
use crate::subprocess::runner::ExitStatus;
use crate::subprocess::{ProcessCommand, ProcessError};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Runs a command whose stdout is a `stream-json` transcript
#[derive(Debug, Default)]
pub struct StreamingCommandRunner;

impl StreamingCommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `command`, feeding its stdout to `session` chunk by chunk.
    ///
    /// Stderr lines are relayed through tracing. The exit status is
    /// returned to the caller; the session is not told about it. On
    /// timeout the process is killed and whatever it already wrote is
    /// still rendered.
    pub async fn run_streaming(
        &self,
        command: ProcessCommand,
        session: &TranscriptSession,
    ) -> Result<StreamingOutput, ProcessError> {
        command.log_start();
        let start = Instant::now();

        let mut cmd = command.to_tokio();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        if command.suppress_stderr {
            cmd.stderr(Stdio::null());
        } else {
            cmd.stderr(Stdio::piped());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ProcessError::from_spawn(&command.program, e))?;

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(relay_lines(stderr, StreamSource::Stderr)));

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::Io(std::io::Error::other("Failed to capture stdout")))?;

        let drive = async {
            if let Err(e) = session.consume(stdout).await {
                tracing::warn!("Error reading stdout of {}: {}", command.program, e);
            }
            child.wait().await
        };

        let waited = match command.timeout {
            Some(limit) => tokio::time::timeout(limit, drive).await.ok(),
            None => Some(drive.await),
        };

        let (status, timed_out) = match waited {
            Some(status) => (ExitStatus::from_std(status?), false),
            None => {
                tracing::warn!(
                    "{} exceeded its timeout of {:?}; killing it",
                    command.program,
                    command.timeout.unwrap_or_default()
                );
                child.start_kill()?;
                let _ = child.wait().await;
                session.finish().await;
                (ExitStatus::Timeout, true)
            }
        };

        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        let duration = start.elapsed();
        tracing::debug!(
            "{} finished with {:?} after {:?}",
            command.program,
            status,
            duration
        );

        Ok(StreamingOutput {
            exit_code: status.code(),
            timed_out,
            duration,
        })
    }
}

/// Forward each line of a side stream to tracing
pub(crate) async fn relay_lines<R>(reader: R, source: StreamSource)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match source {
                StreamSource::Stderr => tracing::warn!(target: "claudo::upstream", "{}", line),
                StreamSource::Stdout => tracing::info!(target: "claudo::upstream", "{}", line),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Stopped relaying {:?}: {}", source, e);
                break;
            }
        }
    }
}
