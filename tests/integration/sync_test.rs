//! Integration tests for full sync passes.

mod helpers;

use mediahub_core::traits::transcoder::{DerivedKind, TranscodeOutcome};
use mediahub_service::SyncOrchestrator;

#[tokio::test]
async fn test_sync_builds_folder_chain_and_files() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/show/e01.mp4", "movies/show/e02.mp4"]);

    let report = SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");

    assert_eq!(report.objects_seen, 2);
    assert_eq!(report.files_created, 2);
    assert_eq!(app.folder_paths(), vec!["", "movies", "movies/show"]);

    let folders = app.store.all_folders();
    let show = folders.iter().find(|f| f.path == "movies/show").expect("show");
    let movies = folders.iter().find(|f| f.path == "movies").expect("movies");
    assert_eq!(show.parent_id, Some(movies.id));

    for file in app.store.all_files() {
        assert_eq!(file.parent_id, show.id);
        assert_eq!(file.url, format!("https://media.test/{}", file.path));
        assert_eq!(file.file_type, ".mp4");
        assert_eq!(file.owner_id, "default_user");
    }
}

#[tokio::test]
async fn test_second_sync_adds_nothing() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/a.mp4", "docs/readme.txt", "music/album/track.mp3"]);
    let orchestrator = SyncOrchestrator::new(app.ctx.clone());

    orchestrator.full_sync().await.expect("first sync");
    let folders = app.folder_paths();
    let files = app.file_paths();
    let thumbnails = app.transcoder.render_calls(DerivedKind::Thumbnail);

    let second = orchestrator.full_sync().await.expect("second sync");
    assert_eq!(second.files_created, 0);
    assert_eq!(second.files_existing, 3);
    assert_eq!(second.derivations, 0);
    assert_eq!(app.folder_paths(), folders);
    assert_eq!(app.file_paths(), files);
    assert_eq!(app.transcoder.render_calls(DerivedKind::Thumbnail), thumbnails);
}

#[tokio::test]
async fn test_sync_skips_filtered_keys() {
    let app = helpers::TestApp::new();
    app.seed(&[
        "movies/a.mp4",
        "thumbnails/movies/a.jpg",
        "subtitles/movies/a.vtt",
        ".cache/b.mp4",
        "movies/.partial.mp4",
        "desktop.ini",
        "movies/index.DAT",
    ]);

    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");

    assert_eq!(app.file_paths(), vec!["movies/a.mp4"]);
    assert_eq!(app.folder_paths(), vec!["", "movies"]);
}

#[tokio::test]
async fn test_sync_derives_only_for_videos() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/a.MKV", "docs/readme.txt"]);

    let report = SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");

    assert_eq!(report.derivations, 1);
    let files = app.store.all_files();
    let video = files.iter().find(|f| f.path == "movies/a.MKV").expect("video");
    assert_eq!(
        video.thumbnail_url.as_deref(),
        Some("https://media.test/thumbnails/movies/a.jpg")
    );
    assert_eq!(
        video.subtitle_url.as_deref(),
        Some("https://media.test/subtitles/movies/a.vtt")
    );
    let doc = files.iter().find(|f| f.path == "docs/readme.txt").expect("doc");
    assert!(doc.thumbnail_url.is_none() && doc.subtitle_url.is_none());

    assert!(app.storage.get("thumbnails/movies/a.jpg").is_some());
    assert!(app.storage.get("subtitles/movies/a.vtt").is_some());
}

#[tokio::test]
async fn test_sync_keeps_thumbnail_when_subtitle_unavailable() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/silent.mp4"]);
    app.transcoder.set_default(
        DerivedKind::Subtitle,
        TranscodeOutcome::Unavailable("no subtitle stream".into()),
    );

    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");

    let file = &app.store.all_files()[0];
    assert!(file.thumbnail_url.is_some());
    assert!(file.subtitle_url.is_none());
}

#[tokio::test]
async fn test_listing_failure_aborts_pass() {
    let app = helpers::TestApp::new();
    app.seed(&["a/1.txt", "a/2.txt", "b/3.txt", "b/4.txt"]);
    app.storage.fail_listing_at_page(1);

    let result = SyncOrchestrator::new(app.ctx.clone()).full_sync().await;
    assert!(result.is_err());

    // Rows written before the failure stay; a later pass completes the rest.
    assert_eq!(app.file_paths(), vec!["a/1.txt", "a/2.txt"]);
    app.storage.fail_listing_at_page(usize::MAX);
    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("rerun");
    assert_eq!(app.file_paths().len(), 4);
}

#[tokio::test]
async fn test_sync_catalogs_keys_with_colons() {
    let app = helpers::TestApp::new();
    app.seed(&["a/ok.mp4", "shows/2024-01-01T10:00/ep.mp4", "z/later.txt"]);
    let orchestrator = SyncOrchestrator::new(app.ctx.clone());

    let report = orchestrator.full_sync().await.expect("sync");
    assert_eq!(report.files_created, 3);
    assert_eq!(
        app.file_paths(),
        vec!["a/ok.mp4", "shows/2024-01-01T10:00/ep.mp4", "z/later.txt"]
    );
    assert!(app.folder_paths().contains(&"shows/2024-01-01T10:00".to_string()));

    let rerun = orchestrator.full_sync().await.expect("rerun");
    assert_eq!(rerun.files_existing, 3);

    let listing = mediahub_service::CatalogBrowser::new(app.ctx.clone())
        .list_folder("shows/2024-01-01T10:00")
        .await
        .expect("listing");
    assert_eq!(listing.files[0].name, "ep.mp4");
}
