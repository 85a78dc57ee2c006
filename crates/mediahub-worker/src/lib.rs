//! Scheduled catalog passes for MediaHub.
//!
//! This crate provides:
//! - A job executor that dispatches to handlers and skips overlapping runs
//! - A cron scheduler that triggers sync and backfill periodically
//! - Job handlers wrapping the sync orchestrator

pub mod executor;
pub mod jobs;
pub mod scheduler;

use std::sync::Arc;

use mediahub_service::{CatalogContext, SyncOrchestrator};

pub use executor::{JobExecutionError, JobExecutor, JobHandler, JobRun};
pub use scheduler::{CronScheduler, run_startup_pass};

/// Executor with the sync and backfill handlers registered.
pub fn build_executor(ctx: CatalogContext) -> JobExecutor {
    let orchestrator = SyncOrchestrator::new(ctx);
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(jobs::SyncJobHandler::new(orchestrator.clone())));
    executor.register(Arc::new(jobs::BackfillJobHandler::new(orchestrator)));
    executor
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use mediahub_core::config::AppConfig;
    use mediahub_core::traits::transcoder::{DerivedKind, TranscodeOutcome};
    use mediahub_database::MemoryCatalogStore;
    use mediahub_storage::MemoryStorageProvider;
    use mediahub_transcoder::mock::MockTranscoder;

    #[tokio::test]
    async fn test_startup_pass_runs_sync_then_backfill() {
        let storage = MemoryStorageProvider::default();
        storage.insert_at("movies/e01.mp4", "video", Utc::now());
        let store = MemoryCatalogStore::new();
        let transcoder = MockTranscoder::new();
        transcoder.push(
            DerivedKind::Thumbnail,
            TranscodeOutcome::Unavailable("first attempt".into()),
        );
        let ctx = CatalogContext::new(
            Arc::new(store.clone()),
            Arc::new(storage),
            Arc::new(transcoder),
            Arc::new(AppConfig::default()),
        );

        let executor = build_executor(ctx);
        assert_eq!(
            executor.registered_types(),
            vec![jobs::BACKFILL_JOB.to_string(), jobs::SYNC_JOB.to_string()]
        );

        let results = run_startup_pass(&executor).await;
        assert_eq!(results[0].0, jobs::SYNC_JOB);
        assert_eq!(results[1].0, jobs::BACKFILL_JOB);
        let Ok(JobRun::Completed(summary)) = &results[1].1 else {
            panic!("backfill did not complete: {:?}", results[1].1);
        };
        assert_eq!(summary["thumbnails"], 1);

        let file = &store.all_files()[0];
        assert!(file.thumbnail_url.is_some());
        assert!(file.subtitle_url.is_some());
    }

    #[tokio::test]
    async fn test_scheduler_rejects_bad_cron() {
        let ctx = CatalogContext::new(
            Arc::new(MemoryCatalogStore::new()),
            Arc::new(MemoryStorageProvider::default()),
            Arc::new(MockTranscoder::new()),
            Arc::new(AppConfig::default()),
        );
        let scheduler = CronScheduler::new(Arc::new(build_executor(ctx))).await.unwrap();
        assert!(scheduler.register(jobs::SYNC_JOB, "not a cron").await.is_err());
        assert!(scheduler.register("unknown", "0 * * * * *").await.is_err());
        scheduler
            .register_default_tasks(&AppConfig::default().worker)
            .await
            .unwrap();
    }
}
