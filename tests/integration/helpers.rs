//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

use mediahub_core::config::AppConfig;
use mediahub_database::MemoryCatalogStore;
use mediahub_service::CatalogContext;
use mediahub_storage::MemoryStorageProvider;
use mediahub_transcoder::mock::MockTranscoder;

/// In-memory catalog, blob store, and scripted transcoder wired together
pub struct TestApp {
    /// Catalog rows
    pub store: MemoryCatalogStore,
    /// Blob store
    pub storage: MemoryStorageProvider,
    /// Scripted transcoder
    pub transcoder: MockTranscoder,
    /// Context handed to services
    pub ctx: CatalogContext,
    /// Holds HLS output until the test ends
    pub hls_root: TempDir,
}

impl TestApp {
    /// Create a new test application with default settings
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a new test application, adjusting the configuration first
    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let hls_root = tempfile::tempdir().expect("Failed to create HLS root");

        let mut config = AppConfig::default();
        config.catalog.public_base_url = "https://media.test/".to_string();
        config.transcoder.hls_root = hls_root.path().to_string_lossy().into_owned();
        adjust(&mut config);

        let store = MemoryCatalogStore::new();
        let storage = MemoryStorageProvider::new(2);
        let transcoder = MockTranscoder::new();
        let ctx = CatalogContext::new(
            Arc::new(store.clone()),
            Arc::new(storage.clone()),
            Arc::new(transcoder.clone()),
            Arc::new(config),
        );

        Self {
            store,
            storage,
            transcoder,
            ctx,
            hls_root,
        }
    }

    /// Put source objects into the blob store, last modified an hour ago
    pub fn seed(&self, keys: &[&str]) {
        let modified = hour_ago();
        for key in keys {
            self.storage.insert_at(key, format!("contents of {key}"), modified);
        }
    }

    /// File paths currently cataloged, sorted
    pub fn file_paths(&self) -> Vec<String> {
        self.store.all_files().into_iter().map(|f| f.path).collect()
    }

    /// Folder paths currently cataloged, sorted
    pub fn folder_paths(&self) -> Vec<String> {
        self.store.all_folders().into_iter().map(|f| f.path).collect()
    }
}

/// One hour before now
pub fn hour_ago() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}
