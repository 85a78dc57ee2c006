//! Errors from running external processes.

use mediahub_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Errors from process execution.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The executable could not be found.
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// The process did not finish in time and was killed.
    #[error("Process timed out after {0} seconds")]
    Timeout(u64),

    /// The process exited with a non-zero code.
    #[error("Process failed with exit code {code}: {stderr}")]
    ProcessFailed {
        /// The exit code (-1 when terminated by a signal).
        code: i32,
        /// Captured standard error, truncated.
        stderr: String,
    },

    /// The consumer went away and the process was killed.
    #[error("Process was cancelled")]
    Cancelled,

    /// IO error while spawning or talking to the process.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<ExecutorError> for AppError {
    fn from(err: ExecutorError) -> Self {
        if matches!(err, ExecutorError::CommandNotFound(_)) {
            return AppError::new(ErrorKind::Configuration, err.to_string());
        }
        AppError::with_source(ErrorKind::ExternalService, err.to_string(), err)
    }
}
