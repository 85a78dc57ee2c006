//! Shared collaborators handed to every catalog component.

use std::sync::Arc;
use std::time::Duration;

use mediahub_core::config::AppConfig;
use mediahub_core::traits::storage::StorageProvider;
use mediahub_core::traits::transcoder::Transcoder;
use mediahub_database::CatalogStore;

/// Catalog store, blob store, transcoder, and configuration.
///
/// Cheap to clone; every field is reference counted.
#[derive(Debug, Clone)]
pub struct CatalogContext {
    /// Persistence boundary for folder and file rows.
    pub store: Arc<dyn CatalogStore>,
    /// The authoritative blob store.
    pub storage: Arc<dyn StorageProvider>,
    /// Out-of-process media transcoder.
    pub transcoder: Arc<dyn Transcoder>,
    /// Loaded application configuration.
    pub config: Arc<AppConfig>,
}

impl CatalogContext {
    /// Bundle the collaborators.
    pub fn new(
        store: Arc<dyn CatalogStore>,
        storage: Arc<dyn StorageProvider>,
        transcoder: Arc<dyn Transcoder>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            storage,
            transcoder,
            config,
        }
    }

    /// Canonical URL of the object at `key`.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}{}", self.config.catalog.public_base_url, key)
    }

    /// Owner recorded on rows this process creates.
    pub fn owner_id(&self) -> &str {
        &self.config.catalog.owner_id
    }

    /// Validity of read references issued to the transcoder.
    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.config.storage.presign_ttl_seconds)
    }

    /// Whether `extension` (without the dot) names a video container.
    pub fn is_video_extension(&self, extension: &str) -> bool {
        self.config
            .catalog
            .video_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Video extensions as dotted lowercase file types (`.mp4`).
    pub fn video_file_types(&self) -> Vec<String> {
        self.config
            .catalog
            .video_extensions
            .iter()
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediahub_database::MemoryCatalogStore;
    use mediahub_storage::MemoryStorageProvider;
    use mediahub_transcoder::mock::MockTranscoder;

    fn context() -> CatalogContext {
        CatalogContext::new(
            Arc::new(MemoryCatalogStore::new()),
            Arc::new(MemoryStorageProvider::default()),
            Arc::new(MockTranscoder::new()),
            Arc::new(AppConfig::default()),
        )
    }

    #[test]
    fn test_public_url_appends_key() {
        assert_eq!(
            context().public_url("movies/e01.mp4"),
            "http://localhost:8080/media_stream?path=movies/e01.mp4"
        );
    }

    #[test]
    fn test_video_extension_case_insensitive() {
        let ctx = context();
        assert!(ctx.is_video_extension("MKV"));
        assert!(!ctx.is_video_extension("txt"));
        assert!(ctx.video_file_types().contains(&".webm".to_string()));
    }
}
