//! Storage provider trait for the authoritative blob store.

use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::result::AppResult;

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StorageObjectMeta {
    /// Slash-separated key relative to the store root.
    pub key: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modified timestamp (if the backend reports one).
    pub last_modified: Option<DateTime<Utc>>,
    /// MIME type (if known).
    pub content_type: Option<String>,
}

/// A byte stream type used for reading object contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// A lazy, finite listing of every object in the store.
///
/// Restartable only by calling [`StorageProvider::list_objects`] again. A
/// page fetch failure surfaces as an `Err` item and ends the listing.
pub type ObjectStream = Pin<Box<dyn Stream<Item = AppResult<StorageObjectMeta>> + Send>>;

/// A reference an external process can read an object through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadHandle {
    /// A signed URL valid until `expires_at`.
    Url {
        /// The signed URL.
        url: String,
        /// Instant after which the URL is rejected by the store.
        expires_at: DateTime<Utc>,
    },
    /// A direct filesystem path (never expires).
    Path {
        /// Absolute path to the object.
        path: PathBuf,
    },
}

impl ReadHandle {
    /// The string passed to the transcoder as its input.
    pub fn input(&self) -> String {
        match self {
            Self::Url { url, .. } => url.clone(),
            Self::Path { path } => path.to_string_lossy().into_owned(),
        }
    }

    /// Whether the reference is no longer usable at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Url { expires_at, .. } => *expires_at <= now,
            Self::Path { .. } => false,
        }
    }

    /// Whether the reference is no longer usable.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Trait for blob store backends.
///
/// Implementations exist for S3-compatible stores, a local directory tree,
/// and an in-memory store. Keys are canonical relative paths.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Enumerate every object, lazily and page by page.
    fn list_objects(&self) -> ObjectStream;

    /// Issue a time-limited read reference for an external reader.
    async fn read_handle(&self, key: &str, ttl: Duration) -> AppResult<ReadHandle>;

    /// Read an object as a byte stream.
    async fn read(&self, key: &str) -> AppResult<ByteStream>;

    /// Write an object, replacing any existing one.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()>;

    /// Metadata for a single object, or `None` when it does not exist.
    async fn head(&self, key: &str) -> AppResult<Option<StorageObjectMeta>>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.head(key).await?.is_some())
    }

    /// Copy an object to a new key within this provider.
    async fn copy(&self, from: &str, to: &str) -> AppResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;
}
