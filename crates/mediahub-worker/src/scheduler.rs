//! Cron scheduler for periodic catalog passes.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use mediahub_core::config::WorkerConfig;
use mediahub_core::error::AppError;

use crate::executor::{JobExecutor, JobRun};
use crate::jobs::{BACKFILL_JOB, SYNC_JOB};

/// Cron-based scheduler that triggers registered jobs
#[derive(Clone)]
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Executor the ticks dispatch to
    executor: Arc<JobExecutor>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(executor: Arc<JobExecutor>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            executor,
        })
    }

    /// Register the sync and backfill schedules from configuration
    pub async fn register_default_tasks(&self, config: &WorkerConfig) -> Result<(), AppError> {
        self.register(SYNC_JOB, &config.sync_cron).await?;
        self.register(BACKFILL_JOB, &config.backfill_cron).await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Run `job_type` on the cron expression `schedule`
    pub async fn register(&self, job_type: &str, schedule: &str) -> Result<(), AppError> {
        if !self.executor.has_handler(job_type) {
            return Err(AppError::configuration(format!(
                "Cannot schedule '{job_type}': no handler registered"
            )));
        }

        let executor = Arc::clone(&self.executor);
        let name = job_type.to_string();
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            let name = name.clone();
            Box::pin(async move {
                tracing::debug!(job_type = %name, "Cron tick");
                if let Err(e) = executor.execute(&name).await {
                    tracing::error!(job_type = %name, error = %e, "Scheduled run failed");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid schedule '{schedule}' for {job_type}: {e}"
            ))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add {job_type} schedule: {e}"))
        })?;

        tracing::info!(job_type, schedule, "Registered schedule");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}

/// Run a full sync and then a backfill, once.
///
/// A failed sync does not prevent the backfill; rows cataloged before the
/// failure still get their artifacts.
pub async fn run_startup_pass(executor: &JobExecutor) -> Vec<(String, Result<JobRun, String>)> {
    let mut results = Vec::new();
    for job_type in [SYNC_JOB, BACKFILL_JOB] {
        let result = executor.execute(job_type).await.map_err(|e| e.to_string());
        results.push((job_type.to_string(), result));
    }
    results
}
