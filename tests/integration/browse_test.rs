//! Integration tests for browsing, renaming, and uploading.

mod helpers;

use bytes::Bytes;
use futures::TryStreamExt;

use mediahub_core::config::StorageBackend;
use mediahub_core::error::ErrorKind;
use mediahub_core::types::CanonicalPath;
use mediahub_service::{CatalogBrowser, FileLocation, SyncOrchestrator, UploadService};

#[tokio::test]
async fn test_listing_after_sync() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/show/e01.mp4", "movies/trailer.mp4", "readme.txt"]);
    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");
    let browser = CatalogBrowser::new(app.ctx.clone());

    let root = browser.list_folder("/").await.expect("root");
    assert_eq!(root.folders, vec!["movies"]);
    assert_eq!(root.files.len(), 1);
    assert_eq!(root.files[0].name, "readme.txt");

    let movies = browser.list_folder("movies").await.expect("movies");
    assert_eq!(movies.folders, vec!["show"]);
    assert_eq!(movies.files[0].path, "movies/trailer.mp4");
    assert_eq!(movies.files[0].file_type, ".mp4");
    assert!(movies.files[0].thumbnail_url.is_some());

    let err = browser.list_folder("music").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_resolve_streams_or_redirects() {
    let app = helpers::TestApp::new();
    app.seed(&["docs/a.txt"]);
    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");

    let location = CatalogBrowser::new(app.ctx.clone())
        .resolve_file("docs/a.txt")
        .await
        .expect("resolve");
    let FileLocation::Stream {
        name,
        content_type,
        body,
        ..
    } = location
    else {
        panic!("local-style backends stream");
    };
    assert_eq!(name, "a.txt");
    assert_eq!(content_type, "text/plain");
    let chunks: Vec<Bytes> = body.try_collect().await.expect("body");
    assert_eq!(chunks.concat(), b"contents of docs/a.txt");

    let redirecting = helpers::TestApp::with_config(|c| c.storage.backend = StorageBackend::S3);
    redirecting.seed(&["docs/a.txt"]);
    SyncOrchestrator::new(redirecting.ctx.clone())
        .full_sync()
        .await
        .expect("sync");
    let location = CatalogBrowser::new(redirecting.ctx.clone())
        .resolve_file("docs/a.txt")
        .await
        .expect("resolve");
    assert!(
        matches!(location, FileLocation::Redirect(url) if url == "https://media.test/docs/a.txt")
    );
}

#[tokio::test]
async fn test_rename_keeps_extension_and_detects_conflicts() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/a.mp4", "movies/b.mp4"]);
    SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");
    let browser = CatalogBrowser::new(app.ctx.clone());

    let renamed = browser
        .rename_file("movies/a.mp4", "pilot")
        .await
        .expect("rename");
    assert_eq!(renamed.new_path, "movies/pilot.mp4");
    assert_eq!(renamed.file.name, "pilot.mp4");
    assert_eq!(renamed.file.url, "https://media.test/movies/pilot.mp4");

    let err = browser.rename_file("movies/b.mp4", "pilot").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = browser.rename_file("movies/a.mp4", "x").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = browser.rename_file("movies/b.mp4", "a/b").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_upload_is_listed_and_survives_sync() {
    let app = helpers::TestApp::new();
    let uploads = UploadService::new(app.ctx.clone());

    let file = uploads
        .register_upload("clips/2024", "intro.mp4", Bytes::from_static(b"video"), None)
        .await
        .expect("upload");
    assert_eq!(file.path, "clips/2024/intro.mp4");
    assert_eq!(file.size, 5);
    assert_eq!(app.storage.get("clips/2024/intro.mp4").as_deref(), Some(&b"video"[..]));

    let report = SyncOrchestrator::new(app.ctx.clone())
        .full_sync()
        .await
        .expect("sync");
    assert_eq!(report.files_created, 0);
    assert_eq!(report.files_existing, 1);

    let listing = CatalogBrowser::new(app.ctx.clone())
        .list_folder("clips/2024")
        .await
        .expect("listing");
    assert_eq!(listing.files.len(), 1);
    assert_eq!(app.folder_paths(), vec!["", "clips", "clips/2024"]);
}

#[tokio::test]
async fn test_traversal_rejected_everywhere_without_side_effects() {
    let app = helpers::TestApp::new();
    app.seed(&["movies/a.mp4"]);
    let browser = CatalogBrowser::new(app.ctx.clone());
    let uploads = UploadService::new(app.ctx.clone());

    let kinds = [
        browser.list_folder("movies/../..").await.map(|_| ()),
        browser.resolve_file("../movies/a.mp4").await.map(|_| ()),
        browser.resolve_file("").await.map(|_| ()),
        browser.rename_file("movies/../a.mp4", "b").await.map(|_| ()),
        uploads
            .register_upload("..", "x.mp4", Bytes::from_static(b"x"), None)
            .await
            .map(|_| ()),
        uploads
            .register_upload("movies", "", Bytes::from_static(b"x"), None)
            .await
            .map(|_| ()),
    ]
    .into_iter()
    .map(|result| result.expect_err("must be rejected").kind)
    .collect::<Vec<_>>();
    assert!(kinds.iter().all(|kind| *kind == ErrorKind::Validation));

    assert!(CanonicalPath::folder("a/../b").is_err());
    assert!(CanonicalPath::object("/").is_err());

    assert!(app.store.all_folders().is_empty());
    assert!(app.store.all_files().is_empty());
    assert_eq!(app.storage.keys(), vec!["movies/a.mp4"]);
    assert_eq!(app.storage.handles_issued(), 0);
}
