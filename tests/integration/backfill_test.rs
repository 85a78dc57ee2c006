//! Integration tests for derived-asset backfill.

mod helpers;

use mediahub_core::traits::transcoder::{DerivedKind, TranscodeOutcome};
use mediahub_service::SyncOrchestrator;

#[tokio::test]
async fn test_backfill_populates_thumbnails_without_new_folders() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/show/e01.mp4", "movies/show/e02.mp4"]);
    app.transcoder
        .push(DerivedKind::Thumbnail, TranscodeOutcome::Unavailable("busy".into()))
        .push(DerivedKind::Thumbnail, TranscodeOutcome::Unavailable("busy".into()));
    let orchestrator = SyncOrchestrator::new(app.ctx.clone());

    orchestrator.full_sync().await.expect("sync");
    assert!(app.store.all_files().iter().all(|f| f.thumbnail_url.is_none()));
    let folders = app.folder_paths();

    let report = orchestrator.backfill().await.expect("backfill");
    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.thumbnails, 2);
    assert_eq!(report.subtitles, 0);
    assert!(app.store.all_files().iter().all(|f| f.thumbnail_url.is_some()));
    assert_eq!(app.folder_paths(), folders);
}

#[tokio::test]
async fn test_backfill_leaves_missing_subtitle_unset() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/silent.mp4"]);
    app.transcoder
        .push(DerivedKind::Thumbnail, TranscodeOutcome::Unavailable("busy".into()))
        .set_default(
            DerivedKind::Subtitle,
            TranscodeOutcome::Unavailable("no subtitle stream".into()),
        );
    let orchestrator = SyncOrchestrator::new(app.ctx.clone());
    orchestrator.full_sync().await.expect("sync");

    orchestrator.backfill().await.expect("backfill");

    let file = &app.store.all_files()[0];
    assert!(file.thumbnail_url.is_some());
    assert!(file.subtitle_url.is_none());
    assert!(app.storage.get("subtitles/movies/silent.vtt").is_none());
}

#[tokio::test]
async fn test_backfill_reuses_existing_artifacts() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/a.mp4"]);
    app.transcoder
        .push(DerivedKind::Thumbnail, TranscodeOutcome::Unavailable("busy".into()));
    let orchestrator = SyncOrchestrator::new(app.ctx.clone());
    orchestrator.full_sync().await.expect("sync");

    // The artifact appears in the store out of band, newer than its source.
    app.storage
        .insert_at("thumbnails/movies/a.jpg", "jpeg", chrono::Utc::now());
    let renders = app.transcoder.render_calls(DerivedKind::Thumbnail);

    orchestrator.backfill().await.expect("backfill");
    assert_eq!(app.transcoder.render_calls(DerivedKind::Thumbnail), renders);
    assert_eq!(
        app.store.all_files()[0].thumbnail_url.as_deref(),
        Some("https://media.test/thumbnails/movies/a.jpg")
    );
}

#[tokio::test]
async fn test_backfill_regenerates_stale_artifact() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/a.mp4"]);
    app.transcoder
        .push(DerivedKind::Thumbnail, TranscodeOutcome::Unavailable("busy".into()));
    let orchestrator = SyncOrchestrator::new(app.ctx.clone());
    orchestrator.full_sync().await.expect("sync");

    let stale = helpers::hour_ago() - chrono::Duration::hours(1);
    app.storage.insert_at("thumbnails/movies/a.jpg", "old", stale);
    let renders = app.transcoder.render_calls(DerivedKind::Thumbnail);

    orchestrator.backfill().await.expect("backfill");
    assert_eq!(app.transcoder.render_calls(DerivedKind::Thumbnail), renders + 1);
    assert_eq!(
        app.storage.get("thumbnails/movies/a.jpg").as_deref(),
        Some(mediahub_transcoder::mock::MockTranscoder::THUMBNAIL)
    );
}

#[tokio::test]
async fn test_backfill_pages_past_unavailable_rows() {
    let app = helpers::TestApp::with_config(|config| config.catalog.backfill_batch_size = 2);
    app.seed(&["v/1.mp4", "v/2.mp4", "v/3.mp4", "v/4.mp4", "v/5.mp4"]);
    app.transcoder.set_default(
        DerivedKind::Thumbnail,
        TranscodeOutcome::Unavailable("corrupt".into()),
    );
    let orchestrator = SyncOrchestrator::new(app.ctx.clone());
    orchestrator.full_sync().await.expect("sync");

    let report = orchestrator.backfill().await.expect("backfill");
    assert_eq!(report.files_scanned, 5);
    assert_eq!(report.files_updated, 0);
}
