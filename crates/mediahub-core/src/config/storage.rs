//! Blob store configuration.

use serde::{Deserialize, Serialize};

/// Which blob store backs the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3-compatible object store. Files resolve to redirects.
    S3,
    /// Local directory tree. Files resolve to byte streams.
    Local,
    /// Process-local store, used by tests and dry runs.
    Memory,
}

impl StorageBackend {
    /// Whether file resolution should redirect to the public object URL.
    pub fn redirects(self) -> bool {
        matches!(self, Self::S3)
    }
}

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Active backend.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Validity of signed read references handed to the transcoder.
    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_seconds: u64,
    /// Page size requested from paginated listings.
    #[serde(default = "default_page_size")]
    pub list_page_size: i32,
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// S3-compatible object storage configuration.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            presign_ttl_seconds: default_presign_ttl(),
            list_page_size: default_page_size(),
            local: LocalStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path for local file storage.
    #[serde(default = "default_local_root")]
    pub root_path: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    /// Endpoint URL for non-AWS services (MinIO, R2). Empty means AWS.
    #[serde(default)]
    pub endpoint: String,
    /// Region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key ID. Empty falls back to the default credential chain.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Use path-style addressing (required by most self-hosted stores).
    #[serde(default = "default_true")]
    pub force_path_style: bool,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            force_path_style: true,
        }
    }
}

fn default_backend() -> StorageBackend {
    StorageBackend::Local
}

fn default_presign_ttl() -> u64 {
    300
}

fn default_page_size() -> i32 {
    1000
}

fn default_local_root() -> String {
    "./data/media".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_true() -> bool {
    true
}
