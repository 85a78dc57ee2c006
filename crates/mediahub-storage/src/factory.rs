//! Builds the configured blob store provider.

use std::sync::Arc;

use tracing::info;

use mediahub_core::config::{StorageBackend, StorageConfig};
use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::StorageProvider;

use crate::providers::{LocalStorageProvider, MemoryStorageProvider};

/// Create the provider selected by `storage.backend`.
pub async fn build_provider(config: &StorageConfig) -> AppResult<Arc<dyn StorageProvider>> {
    let provider: Arc<dyn StorageProvider> = match config.backend {
        StorageBackend::Local => {
            Arc::new(LocalStorageProvider::new(&config.local.root_path).await?)
        }
        StorageBackend::Memory => Arc::new(MemoryStorageProvider::new(
            usize::try_from(config.list_page_size).unwrap_or(1000),
        )),
        StorageBackend::S3 => build_s3(config).await?,
    };

    info!(provider = provider.provider_type(), "Storage provider ready");
    Ok(provider)
}

#[cfg(feature = "s3")]
async fn build_s3(config: &StorageConfig) -> AppResult<Arc<dyn StorageProvider>> {
    let provider =
        crate::providers::S3StorageProvider::new(&config.s3, config.list_page_size).await?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "s3"))]
async fn build_s3(_config: &StorageConfig) -> AppResult<Arc<dyn StorageProvider>> {
    Err(mediahub_core::error::AppError::configuration(
        "storage.backend = \"s3\" requires the `s3` feature of mediahub-storage",
    ))
}
