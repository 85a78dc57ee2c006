//! Full sync and backfill passes.
//!
//! A full sync walks the source listing, catalogs every accepted key, and
//! derives artifacts for videos seen for the first time. A backfill walks
//! catalog rows still missing a pointer and derives only what is missing.
//! Both passes are safe to overlap with each other and with themselves:
//! every write is an insert-if-absent or a coalescing update.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_entity::file::{AssetUpdate, File, NewFile};

use crate::assets::AssetDeriver;
use crate::catalog::PathResolver;
use crate::context::CatalogContext;
use crate::sync::enumerator::{SourceEnumerator, SourceObject};
use crate::sync::filter::KeyFilter;

/// Counters for a full sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Accepted objects read from the listing.
    pub objects_seen: u64,
    /// Keys listed more than once in this pass.
    pub duplicates: u64,
    /// File rows created.
    pub files_created: u64,
    /// Keys already cataloged.
    pub files_existing: u64,
    /// Derivations started.
    pub derivations: u64,
    /// Thumbnails attached.
    pub thumbnails: u64,
    /// Subtitle tracks attached.
    pub subtitles: u64,
    /// Wall time.
    pub duration_ms: u64,
}

/// Counters for a backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Rows examined.
    pub files_scanned: u64,
    /// Rows that received at least one pointer.
    pub files_updated: u64,
    /// Thumbnails attached.
    pub thumbnails: u64,
    /// Subtitle tracks attached.
    pub subtitles: u64,
    /// Wall time.
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct Attached {
    thumbnails: u64,
    subtitles: u64,
    updated: u64,
    failure: Option<AppError>,
}

/// Runs catalog passes.
#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    ctx: CatalogContext,
    enumerator: SourceEnumerator,
    resolver: PathResolver,
    deriver: AssetDeriver,
    permits: Arc<Semaphore>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator over the given context.
    pub fn new(ctx: CatalogContext) -> Self {
        let filter = KeyFilter::from_config(&ctx.config.catalog);
        let permits = Arc::new(Semaphore::new(ctx.config.catalog.derive_concurrency.max(1)));
        Self {
            enumerator: SourceEnumerator::new(ctx.storage.clone(), filter),
            resolver: PathResolver::new(ctx.clone()),
            deriver: AssetDeriver::new(ctx.clone()),
            permits,
            ctx,
        }
    }

    /// The deriver used by this orchestrator.
    pub fn deriver(&self) -> &AssetDeriver {
        &self.deriver
    }

    /// Mirror the source listing into the catalog.
    ///
    /// A listing failure or a persistence failure abandons the pass after
    /// in-flight derivations finish; rows written so far stay.
    pub async fn full_sync(&self) -> AppResult<SyncReport> {
        let start = Instant::now();
        let mut report = SyncReport::default();
        let mut processed = HashSet::new();
        let mut queue = DerivationQueue::new(self.queue_limit());
        let mut objects = self.enumerator.objects();

        let outcome: AppResult<()> = async {
            while let Some(item) = objects.next().await {
                let object = item?;
                report.objects_seen += 1;
                if !processed.insert(object.key.clone()) {
                    report.duplicates += 1;
                    continue;
                }

                let (file, inserted) = self.catalog_object(&object).await?;
                if !inserted {
                    report.files_existing += 1;
                    continue;
                }
                report.files_created += 1;
                debug!(key = %object.key, file_id = %file.id, "Cataloged new file");

                if self.is_video(&file) {
                    report.derivations += 1;
                    queue.push(self.derivation(file)).await;
                    if queue.failed() {
                        break;
                    }
                }
            }
            Ok(())
        }
        .await;

        let attached = queue.finish().await;
        report.thumbnails = attached.thumbnails;
        report.subtitles = attached.subtitles;
        report.duration_ms = start.elapsed().as_millis() as u64;

        if let Err(e) = outcome.and(attached.failure.map_or(Ok(()), Err)) {
            error!(error = %e, seen = report.objects_seen, "Full sync aborted");
            return Err(e);
        }

        info!(
            seen = report.objects_seen,
            created = report.files_created,
            existing = report.files_existing,
            thumbnails = report.thumbnails,
            subtitles = report.subtitles,
            duration_ms = report.duration_ms,
            "Full sync completed"
        );
        Ok(report)
    }

    /// Derive missing artifacts for cataloged videos.
    pub async fn backfill(&self) -> AppResult<BackfillReport> {
        let start = Instant::now();
        let mut report = BackfillReport::default();
        let batch_size = self.ctx.config.catalog.backfill_batch_size.max(1);
        let file_types = self.ctx.video_file_types();
        let mut after = None;

        loop {
            let batch = self
                .ctx
                .store
                .find_missing_assets(after, batch_size, &file_types)
                .await?;
            let Some(last) = batch.last() else {
                break;
            };
            after = Some(last.id);
            let batch_len = batch.len();
            report.files_scanned += batch_len as u64;

            let mut queue = DerivationQueue::new(self.queue_limit());
            for file in batch {
                queue.push(self.derivation(file)).await;
            }
            let attached = queue.finish().await;
            report.thumbnails += attached.thumbnails;
            report.subtitles += attached.subtitles;
            report.files_updated += attached.updated;
            if let Some(e) = attached.failure {
                error!(error = %e, scanned = report.files_scanned, "Backfill aborted");
                return Err(e);
            }

            if (batch_len as i64) < batch_size {
                break;
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            scanned = report.files_scanned,
            updated = report.files_updated,
            thumbnails = report.thumbnails,
            subtitles = report.subtitles,
            duration_ms = report.duration_ms,
            "Backfill completed"
        );
        Ok(report)
    }

    async fn catalog_object(&self, object: &SourceObject) -> AppResult<(File, bool)> {
        let parent_id = self.resolver.resolve_parent(&object.key).await?;
        let key = object.key.as_str();
        let upserted = self
            .ctx
            .store
            .upsert_file(NewFile {
                owner_id: self.ctx.owner_id().to_string(),
                name: object.key.name().to_string(),
                path: key.to_string(),
                size: i64::try_from(object.size).unwrap_or(i64::MAX),
                url: self.ctx.public_url(key),
                file_type: object
                    .key
                    .extension()
                    .map(|ext| format!(".{ext}"))
                    .unwrap_or_default(),
                parent_id,
                created_at: object.last_modified.unwrap_or_else(Utc::now),
            })
            .await?;
        Ok((upserted.row, upserted.inserted))
    }

    fn is_video(&self, file: &File) -> bool {
        file.extension()
            .is_some_and(|ext| self.ctx.is_video_extension(&ext))
    }

    fn queue_limit(&self) -> usize {
        self.ctx.config.catalog.derive_concurrency.max(1) * QUEUED_PER_PERMIT
    }

    fn derivation(&self, file: File) -> BoxFuture<'static, AppResult<AssetUpdate>> {
        let permits = self.permits.clone();
        let deriver = self.deriver.clone();
        let store = self.ctx.store.clone();
        Box::pin(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| AppError::internal(format!("Derivation limiter closed: {e}")))?;
            let update = deriver.derive_missing(&file).await?;
            if !update.is_empty() {
                store.update_file_assets(file.id, update.clone()).await?;
            }
            Ok(update)
        })
    }
}

/// Derivation tasks spawned ahead of the running ones, per permit.
const QUEUED_PER_PERMIT: usize = 4;

/// Spawned derivations, bounded so a large listing cannot queue one task
/// per object.
struct DerivationQueue {
    tasks: JoinSet<AppResult<AssetUpdate>>,
    limit: usize,
    attached: Attached,
}

impl DerivationQueue {
    fn new(limit: usize) -> Self {
        Self {
            tasks: JoinSet::new(),
            limit: limit.max(1),
            attached: Attached::default(),
        }
    }

    /// Spawn `task`, first waiting for earlier tasks while the queue is full.
    async fn push(&mut self, task: BoxFuture<'static, AppResult<AssetUpdate>>) {
        while self.tasks.len() >= self.limit {
            match self.tasks.join_next().await {
                Some(joined) => self.attached.record(joined),
                None => break,
            }
        }
        self.tasks.spawn(task);
    }

    fn failed(&self) -> bool {
        self.attached.failure.is_some()
    }

    async fn finish(mut self) -> Attached {
        while let Some(joined) = self.tasks.join_next().await {
            self.attached.record(joined);
        }
        self.attached
    }
}

impl Attached {
    fn record(&mut self, joined: Result<AppResult<AssetUpdate>, JoinError>) {
        match joined {
            Ok(Ok(update)) => {
                let thumbnail = update.thumbnail_url.is_some();
                let subtitle = update.subtitle_url.is_some();
                self.thumbnails += u64::from(thumbnail);
                self.subtitles += u64::from(subtitle);
                self.updated += u64::from(thumbnail || subtitle);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Derivation task failed");
                self.failure.get_or_insert(e);
            }
            Err(e) => {
                warn!(error = %e, "Derivation task panicked or was aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mediahub_core::config::AppConfig;
    use mediahub_core::traits::transcoder::{DerivedKind, TranscodeOutcome};
    use mediahub_database::MemoryCatalogStore;
    use mediahub_storage::MemoryStorageProvider;
    use mediahub_transcoder::mock::MockTranscoder;

    struct Fixture {
        orchestrator: SyncOrchestrator,
        store: MemoryCatalogStore,
        storage: MemoryStorageProvider,
        transcoder: MockTranscoder,
    }

    fn fixture(keys: &[&str]) -> Fixture {
        let storage = MemoryStorageProvider::new(2);
        for key in keys {
            storage.insert_at(key, "video", Utc::now());
        }
        let store = MemoryCatalogStore::new();
        let transcoder = MockTranscoder::new();
        let ctx = CatalogContext::new(
            Arc::new(store.clone()),
            Arc::new(storage.clone()),
            Arc::new(transcoder.clone()),
            Arc::new(AppConfig::default()),
        );
        Fixture {
            orchestrator: SyncOrchestrator::new(ctx),
            store,
            storage,
            transcoder,
        }
    }

    #[tokio::test]
    async fn test_second_sync_adds_nothing() {
        let f = fixture(&["movies/show/e01.mp4", "docs/a.txt", "b.mkv"]);

        let first = f.orchestrator.full_sync().await.unwrap();
        assert_eq!(first.files_created, 3);
        assert_eq!(first.derivations, 2);
        let folders = f.store.all_folders().len();

        let second = f.orchestrator.full_sync().await.unwrap();
        assert_eq!(second.files_created, 0);
        assert_eq!(second.files_existing, 3);
        assert_eq!(second.derivations, 0);
        assert_eq!(f.store.all_folders().len(), folders);
        assert_eq!(f.store.all_files().len(), 3);
    }

    #[tokio::test]
    async fn test_new_video_gets_both_artifacts() {
        let f = fixture(&["e01.mp4"]);
        let report = f.orchestrator.full_sync().await.unwrap();
        assert_eq!(report.thumbnails, 1);
        assert_eq!(report.subtitles, 1);

        let file = &f.store.all_files()[0];
        assert!(file.thumbnail_url.as_deref().unwrap().ends_with("thumbnails/e01.jpg"));
        assert!(file.subtitle_url.as_deref().unwrap().ends_with("subtitles/e01.vtt"));
        assert!(f.storage.get("thumbnails/e01.jpg").is_some());
    }

    #[tokio::test]
    async fn test_derived_artifacts_not_cataloged() {
        let f = fixture(&["e01.mp4"]);
        f.orchestrator.full_sync().await.unwrap();
        f.orchestrator.full_sync().await.unwrap();
        let paths: Vec<String> = f.store.all_files().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["e01.mp4"]);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_pass() {
        let f = fixture(&["a.txt", "b.txt", "c.txt"]);
        f.storage.fail_listing_at_page(1);

        let err = f.orchestrator.full_sync().await.unwrap_err();
        assert_eq!(err.kind, mediahub_core::error::ErrorKind::Storage);
        assert_eq!(f.store.all_files().len(), 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_abandons_pass() {
        let f = fixture(&["a/x.txt", "b/y.txt"]);
        f.store.fail_folder_inserts("b");

        assert!(f.orchestrator.full_sync().await.is_err());
        assert_eq!(f.store.all_files().len(), 1);

        f.store.clear_folder_failures();
        let report = f.orchestrator.full_sync().await.unwrap();
        assert_eq!(report.files_created, 1);
        assert_eq!(report.files_existing, 1);
    }

    #[tokio::test]
    async fn test_backfill_fills_only_missing() {
        let f = fixture(&["e01.mp4"]);
        f.transcoder.push(
            DerivedKind::Thumbnail,
            TranscodeOutcome::Unavailable("decoder error".into()),
        );
        f.orchestrator.full_sync().await.unwrap();
        let file = f.store.all_files().remove(0);
        assert!(file.thumbnail_url.is_none());
        assert!(file.subtitle_url.is_some());

        let report = f.orchestrator.backfill().await.unwrap();
        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.thumbnails, 1);
        assert_eq!(report.subtitles, 0);
        assert_eq!(f.transcoder.render_calls(DerivedKind::Subtitle), 1);

        let again = f.orchestrator.backfill().await.unwrap();
        assert_eq!(again.files_scanned, 0);
    }

    #[tokio::test]
    async fn test_backfill_pages_past_unavailable_rows() {
        let keys: Vec<String> = (0..5).map(|i| format!("v{i}.mp4")).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let f = fixture(&refs);
        f.transcoder.set_default(
            DerivedKind::Subtitle,
            TranscodeOutcome::Unavailable("no subtitle stream".into()),
        );
        f.orchestrator.full_sync().await.unwrap();

        let mut config = AppConfig::default();
        config.catalog.backfill_batch_size = 2;
        let ctx = CatalogContext::new(
            Arc::new(f.store.clone()),
            Arc::new(f.storage.clone()),
            Arc::new(f.transcoder.clone()),
            Arc::new(config),
        );
        let report = SyncOrchestrator::new(ctx).backfill().await.unwrap();
        assert_eq!(report.files_scanned, 5);
        assert_eq!(report.files_updated, 0);
    }

    #[tokio::test]
    async fn test_derivation_queue_waits_when_full() {
        let mut queue = DerivationQueue::new(2);
        let (release, gate) = tokio::sync::watch::channel(false);
        for _ in 0..2 {
            let mut gate = gate.clone();
            queue
                .push(Box::pin(async move {
                    let _ = gate.wait_for(|open| *open).await;
                    Ok(AssetUpdate::default())
                }))
                .await;
        }

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            queue.push(Box::pin(async { Ok(AssetUpdate::default()) })),
        )
        .await;
        assert!(blocked.is_err());
        assert_eq!(queue.tasks.len(), 2);

        release.send(true).unwrap();
        queue
            .push(Box::pin(async {
                Ok(AssetUpdate {
                    thumbnail_url: Some("t".into()),
                    subtitle_url: None,
                })
            }))
            .await;
        let attached = queue.finish().await;
        assert_eq!(attached.thumbnails, 1);
        assert_eq!(attached.updated, 1);
        assert!(attached.failure.is_none());
    }
}
