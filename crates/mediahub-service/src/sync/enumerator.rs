//! Lazy enumeration of catalogable source objects.

use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, future};
use tracing::{debug, warn};

use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::StorageProvider;
use mediahub_core::types::CanonicalPath;

use crate::sync::filter::KeyFilter;

/// An object that passed the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceObject {
    /// Canonical key.
    pub key: CanonicalPath,
    /// Size in bytes.
    pub size: u64,
    /// Modification time reported by the store.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Stream of filtered source objects. An `Err` item ends the listing.
pub type SourceStream = Pin<Box<dyn Stream<Item = AppResult<SourceObject>> + Send>>;

/// Wraps a provider listing with the key filter.
#[derive(Debug, Clone)]
pub struct SourceEnumerator {
    storage: Arc<dyn StorageProvider>,
    filter: KeyFilter,
}

impl SourceEnumerator {
    /// Creates an enumerator over `storage`.
    pub fn new(storage: Arc<dyn StorageProvider>, filter: KeyFilter) -> Self {
        Self { storage, filter }
    }

    /// Start a new listing from the beginning.
    ///
    /// Filtered keys and keys that are not valid canonical paths are
    /// dropped here.
    pub fn objects(&self) -> SourceStream {
        let filter = self.filter.clone();
        let stream = self.storage.list_objects().filter_map(move |item| {
            let mapped = match item {
                Err(e) => Some(Err(e)),
                Ok(meta) if !filter.accepts(&meta.key) => {
                    debug!(key = %meta.key, "Skipping filtered key");
                    None
                }
                Ok(meta) => match CanonicalPath::object(&meta.key) {
                    Ok(key) => Some(Ok(SourceObject {
                        key,
                        size: meta.size_bytes,
                        last_modified: meta.last_modified,
                    })),
                    Err(e) => {
                        warn!(key = %meta.key, error = %e, "Skipping key that is not a valid path");
                        None
                    }
                },
            };
            future::ready(mapped)
        });
        Box::pin(stream)
    }
}
