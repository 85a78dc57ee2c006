//! Job executor: dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use mediahub_core::error::AppError;

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job type this handler processes
    fn job_type(&self) -> &str;

    /// Run the job, returning a summary for logs and the CLI
    async fn execute(&self) -> Result<Value, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, do not retry
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, the next tick may succeed
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// What happened when a job was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRun {
    /// The handler ran to completion.
    Completed(Value),
    /// A previous run of the same type was still in progress.
    Skipped,
}

#[derive(Debug)]
struct Registered {
    handler: Arc<dyn JobHandler>,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the run ends, however it ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Dispatches jobs to the appropriate handler based on job type.
///
/// At most one run per job type is in flight; a request arriving while
/// one is running is skipped rather than queued.
#[derive(Debug, Default)]
pub struct JobExecutor {
    handlers: HashMap<String, Registered>,
}

impl JobExecutor {
    /// Create an executor with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(
            job_type,
            Registered {
                handler,
                running: Arc::new(AtomicBool::new(false)),
            },
        );
    }

    /// Run the handler for `job_type` unless it is already running
    pub async fn execute(&self, job_type: &str) -> Result<JobRun, JobExecutionError> {
        let registered = self.handlers.get(job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!("No handler registered for job type '{job_type}'"))
        })?;

        if registered
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!(job_type, "Previous run still in progress, skipping");
            return Ok(JobRun::Skipped);
        }
        let _guard = RunningGuard(registered.running.clone());

        let start = Instant::now();
        tracing::info!(job_type, "Executing job");
        let result = registered.handler.execute().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(summary) => {
                tracing::info!(job_type, duration_ms, "Job completed");
                Ok(JobRun::Completed(summary))
            }
            Err(e) => {
                tracing::error!(job_type, duration_ms, error = %e, "Job failed");
                Err(e)
            }
        }
    }

    /// Whether a run of `job_type` is in progress
    pub fn is_running(&self, job_type: &str) -> bool {
        self.handlers
            .get(job_type)
            .is_some_and(|r| r.running.load(Ordering::Acquire))
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}
