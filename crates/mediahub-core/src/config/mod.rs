//! Application configuration schemas.
//!
//! All configuration structs are deserialized from a TOML file via the
//! `config` crate, overlaid by environment variables. Each sub-module
//! represents a logical configuration section and every section has
//! serde defaults, so an empty file yields a usable configuration.

pub mod catalog;
pub mod database;
pub mod logging;
pub mod storage;
pub mod transcoder;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::catalog::CatalogConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::storage::{LocalStorageConfig, S3StorageConfig, StorageBackend, StorageConfig};
pub use self::transcoder::TranscoderConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "MEDIAHUB";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob store settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Catalog mirroring settings.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// External transcoder settings.
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    /// Scheduled job settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file is optional. Environment variables prefixed with
    /// `MEDIAHUB__` override file values, using `__` as the section
    /// separator (e.g. `MEDIAHUB__STORAGE__BACKEND=local`).
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("catalog.video_extensions")
                    .with_list_parse_key("catalog.skip_extensions")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject settings that would make a pass misbehave rather than fail.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.catalog.derive_concurrency == 0 {
            return Err(AppError::configuration(
                "catalog.derive_concurrency must be at least 1",
            ));
        }
        if self.catalog.backfill_batch_size == 0 {
            return Err(AppError::configuration(
                "catalog.backfill_batch_size must be at least 1",
            ));
        }
        if self.transcoder.max_attempts == 0 {
            return Err(AppError::configuration(
                "transcoder.max_attempts must be at least 1",
            ));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.s3.bucket.is_empty() {
            return Err(AppError::configuration(
                "storage.s3.bucket is required for the s3 backend",
            ));
        }
        Ok(())
    }
}
