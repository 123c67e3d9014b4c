//! Shared subprocess execution.
//!
//! [`run_command`] is the common spawn + capture + timeout logic behind the
//! process runner. The caller builds a [`tokio::process::Command`] with the
//! program and arguments; spawning, full stream capture, and the wall-clock
//! ceiling are handled here.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output beyond this limit is truncated to prevent memory exhaustion from
/// extremely verbose child processes.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Captured result of a completed child process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Complete stdout, captured after the process exited.
    pub stdout: String,
    /// Complete stderr, captured separately from stdout.
    pub stderr: String,
    /// Process exit code (`-1` if killed by a signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Errors raised while spawning or waiting on a child process.
#[derive(Debug, thiserror::Error)]
pub enum SubprocessError {
    #[error("process timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spawn `cmd`, capture stdout and stderr in full, and wait for exit under
/// `timeout`.
///
/// The command's program and arguments must already be set. stdin is closed;
/// both output streams are read concurrently with the process wait so large
/// outputs cannot deadlock the pipe buffers.
pub async fn run_command(
    cmd: &mut Command,
    timeout: Duration,
) -> Result<CommandOutput, SubprocessError> {
    // `kill_on_drop(true)` ensures the child dies when the future is dropped,
    // whether from the timeout below or from cycle cancellation above us.
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();

    let mut child = cmd.spawn()?;

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();

            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms,
            })
        }
        Ok(Err(e)) => Err(SubprocessError::Io(e)),
        Err(_elapsed) => {
            // `child` is dropped here, which kills the process.
            Err(SubprocessError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
