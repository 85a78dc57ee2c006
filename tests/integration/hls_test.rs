//! Integration tests for on-demand HLS generation.

mod helpers;

use std::time::{Duration, SystemTime};

use futures::StreamExt;

use mediahub_core::traits::transcoder::HLS_PLAYLIST;
use mediahub_core::types::CanonicalPath;
use mediahub_service::{HlsService, PlaylistHandle, SyncOrchestrator};

async fn finish(handle: PlaylistHandle) -> mediahub_service::CleanupReport {
    let PlaylistHandle::Generating {
        output, cleanup, ..
    } = handle
    else {
        panic!("expected a generation");
    };
    let relayed: Vec<_> = output.collect().await;
    assert!(!relayed.is_empty());
    cleanup.await.expect("cleanup task")
}

#[tokio::test]
async fn test_hls_cached_within_window_regenerated_after() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/show/e01.mp4"]);
    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");

    let hls = HlsService::new(app.ctx.clone());
    let key = CanonicalPath::object("movies/show/e01.mp4").expect("key");

    let report = finish(hls.ensure_hls(&key).await.expect("first")).await;
    assert!(report.completed);
    let playlist = app
        .hls_root
        .path()
        .join("movies")
        .join("show")
        .join("e01")
        .join(HLS_PLAYLIST);
    assert!(playlist.exists());

    let second = hls.ensure_hls(&key).await.expect("second");
    assert!(matches!(second, PlaylistHandle::Cached { .. }));
    assert_eq!(second.playlist(), Some(playlist.as_path()));
    assert_eq!(app.transcoder.hls_calls(), 1);

    std::fs::File::options()
        .write(true)
        .open(&playlist)
        .expect("open playlist")
        .set_modified(SystemTime::now() - Duration::from_secs(25 * 3600))
        .expect("age playlist");

    finish(hls.ensure_hls(&key).await.expect("third")).await;
    assert_eq!(app.transcoder.hls_calls(), 2);
}

#[tokio::test]
async fn test_hls_output_dirs_do_not_collide() {
    let app = helpers::TestApp::new();
    app.seed(&["a/clip.mp4", "b/clip.mp4"]);
    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");
    let hls = HlsService::new(app.ctx.clone());

    for key in ["a/clip.mp4", "b/clip.mp4"] {
        let key = CanonicalPath::object(key).expect("key");
        finish(hls.ensure_hls(&key).await.expect("generate")).await;
    }

    assert_eq!(app.transcoder.hls_calls(), 2);
    assert!(app.hls_root.path().join("a/clip").join(HLS_PLAYLIST).exists());
    assert!(app.hls_root.path().join("b/clip").join(HLS_PLAYLIST).exists());
}

#[tokio::test]
async fn test_hls_short_window_regenerates_every_time() {
    let app = helpers::TestApp::with_config(|config| config.transcoder.hls_freshness_hours = 0);
    app.seed(&["e01.webm"]);
    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");
    let hls = HlsService::new(app.ctx.clone());
    let key = CanonicalPath::object("e01.webm").expect("key");

    finish(hls.ensure_hls(&key).await.expect("first")).await;
    finish(hls.ensure_hls(&key).await.expect("second")).await;
    assert_eq!(app.transcoder.hls_calls(), 2);
}

#[tokio::test]
async fn test_hls_concurrent_request_waits_for_running_generation() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/e01.mp4"]);
    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");
    app.transcoder.delay_hls_playlist(Duration::from_millis(300));
    let hls = HlsService::new(app.ctx.clone());
    let key = CanonicalPath::object("movies/e01.mp4").expect("key");

    let first = hls.ensure_hls(&key).await.expect("first");
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = hls.ensure_hls(&key).await.expect("second");
    assert!(matches!(second, PlaylistHandle::InProgress { .. }));
    assert_eq!(app.transcoder.hls_calls(), 1);

    finish(first).await;
    let third = hls.ensure_hls(&key).await.expect("third");
    assert!(matches!(third, PlaylistHandle::Cached { .. }));
    assert_eq!(app.transcoder.hls_calls(), 1);
}

#[tokio::test]
async fn test_hls_requires_cataloged_source() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/e01.mp4"]);
    let hls = HlsService::new(app.ctx.clone());
    let key = CanonicalPath::object("movies/e01.mp4").expect("key");

    let err = hls.ensure_hls(&key).await.expect_err("not cataloged");
    assert!(err.is_not_found());
    assert_eq!(app.transcoder.hls_calls(), 0);
}
