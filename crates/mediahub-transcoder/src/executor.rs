//! External process execution.
//!
//! Runs tools as child processes either to completion with captured
//! output and a timeout, or streaming their stdout to a consumer whose
//! disappearance kills the process.

use std::process::Stdio;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use mediahub_core::traits::storage::ByteStream;

use crate::error::ExecutorError;
use crate::stream::CancelOnDrop;

/// Characters of stderr kept in errors.
const STDERR_LIMIT: usize = 2000;

/// Parameters for running a command.
#[derive(Debug, Clone)]
pub struct ExecutionParams {
    /// The command to execute.
    pub command: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Timeout in seconds. Ignored for streaming runs.
    pub timeout_seconds: u64,
}

impl ExecutionParams {
    /// Params for `command` with no arguments yet.
    pub fn new(command: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout_seconds,
        }
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Output of a process that ran to completion successfully.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// Raw standard output.
    pub stdout: Bytes,
    /// Standard error (lossy UTF-8).
    pub stderr: String,
    /// Wall time.
    pub duration_ms: u64,
}

/// A process whose stdout is being streamed.
pub struct StreamingProcess {
    /// Stdout chunks. Dropping this before EOF kills the process.
    pub stdout: ByteStream,
    /// Resolves when the process exits or is killed.
    pub completion: JoinHandle<Result<(), ExecutorError>>,
}

/// Executor for external commands.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Create a new executor.
    pub fn new() -> Self {
        Self
    }

    fn command(params: &ExecutionParams) -> Command {
        let mut cmd = Command::new(&params.command);
        cmd.args(&params.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(params: &ExecutionParams, e: std::io::Error) -> ExecutorError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExecutorError::CommandNotFound(params.command.clone())
        } else {
            ExecutorError::IoError(e)
        }
    }

    /// Run a command to completion, capturing stdout in memory.
    pub async fn execute(&self, params: &ExecutionParams) -> Result<CapturedOutput, ExecutorError> {
        let start = Instant::now();
        tracing::debug!(command = %params.command, args = ?params.args, "Executing process");

        let child = Self::command(params)
            .spawn()
            .map_err(|e| Self::spawn_error(params, e))?;

        let timeout = Duration::from_secs(params.timeout_seconds);
        // Dropping the wait future on timeout drops the child, which kills it.
        let result = tokio::time::timeout(timeout, child.wait_with_output()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if !output.status.success() {
                    let code = output.status.code().unwrap_or(-1);
                    tracing::debug!(
                        command = %params.command,
                        code,
                        duration_ms,
                        "Process exited unsuccessfully"
                    );
                    return Err(ExecutorError::ProcessFailed {
                        code,
                        stderr: stderr.chars().take(STDERR_LIMIT).collect(),
                    });
                }
                tracing::debug!(
                    command = %params.command,
                    duration_ms,
                    bytes = output.stdout.len(),
                    "Process completed"
                );
                Ok(CapturedOutput {
                    stdout: Bytes::from(output.stdout),
                    stderr,
                    duration_ms,
                })
            }
            Ok(Err(e)) => Err(ExecutorError::IoError(e)),
            Err(_) => {
                tracing::warn!(
                    command = %params.command,
                    timeout_seconds = params.timeout_seconds,
                    "Process timed out"
                );
                Err(ExecutorError::Timeout(params.timeout_seconds))
            }
        }
    }

    /// Start a command and stream its stdout.
    ///
    /// The process is killed if the stdout stream is dropped before it
    /// ends. `completion` reports the exit status either way.
    pub fn spawn_streaming(&self, params: &ExecutionParams) -> Result<StreamingProcess, ExecutorError> {
        tracing::debug!(command = %params.command, args = ?params.args, "Spawning streaming process");

        let mut child = Self::command(params)
            .spawn()
            .map_err(|e| Self::spawn_error(params, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutorError::IoError(std::io::Error::other("stdout not piped")))?;
        let stderr_task = child.stderr.take().map(|pipe| tokio::spawn(read_limited(pipe)));

        let token = CancellationToken::new();
        let watch = token.clone();
        let command = params.command.clone();

        let completion = tokio::spawn(async move {
            let waited = tokio::select! {
                status = child.wait() => Some(status),
                _ = watch.cancelled() => None,
            };

            let Some(status) = waited else {
                if let Err(e) = child.kill().await {
                    tracing::warn!(command = %command, error = %e, "Failed to kill cancelled process");
                }
                tracing::info!(command = %command, "Streaming process cancelled by consumer");
                return Err(ExecutorError::Cancelled);
            };

            let status = status?;
            let stderr = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };
            if status.success() {
                Ok(())
            } else {
                Err(ExecutorError::ProcessFailed {
                    code: status.code().unwrap_or(-1),
                    stderr,
                })
            }
        });

        Ok(StreamingProcess {
            stdout: Box::pin(CancelOnDrop::new(ReaderStream::new(stdout), token)),
            completion,
        })
    }
}

async fn read_limited<R: AsyncRead + Unpin>(mut pipe: R) -> String {
    let mut buf = Vec::new();
    if pipe.read_to_end(&mut buf).await.is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf)
        .chars()
        .take(STDERR_LIMIT)
        .collect()
}
