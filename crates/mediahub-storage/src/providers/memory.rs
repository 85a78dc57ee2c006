//! In-memory storage provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::stream;

use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::{
    ByteStream, ObjectStream, ReadHandle, StorageObjectMeta, StorageProvider,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// Blob store held in a `DashMap`.
///
/// Listing is paged like a remote store: keys are snapshotted one page at
/// a time in lexicographic order.
#[derive(Debug, Clone)]
pub struct MemoryStorageProvider {
    objects: Arc<DashMap<String, StoredObject>>,
    page_size: usize,
    fail_page: Arc<AtomicUsize>,
    fail_deletes: Arc<AtomicBool>,
    handles_issued: Arc<AtomicU64>,
}

impl Default for MemoryStorageProvider {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MemoryStorageProvider {
    /// Create an empty store listing `page_size` keys per page.
    pub fn new(page_size: usize) -> Self {
        Self {
            objects: Arc::new(DashMap::new()),
            page_size: page_size.max(1),
            fail_page: Arc::new(AtomicUsize::new(usize::MAX)),
            fail_deletes: Arc::new(AtomicBool::new(false)),
            handles_issued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Store an object with an explicit modification time.
    pub fn insert_at(&self, key: &str, data: impl Into<Bytes>, last_modified: DateTime<Utc>) {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                data: data.into(),
                content_type: crate::content_type_for(key),
                last_modified,
            },
        );
    }

    /// Make the listing fail when fetching the page with this zero-based index.
    pub fn fail_listing_at_page(&self, page: usize) {
        self.fail_page.store(page, Ordering::Relaxed);
    }

    /// Make every delete fail while set.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::Relaxed);
    }

    /// Raw bytes of an object, if present.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.get(key).map(|o| o.data.clone())
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of read handles issued so far.
    pub fn handles_issued(&self) -> u64 {
        self.handles_issued.load(Ordering::Relaxed)
    }

    fn page_after(&self, after: Option<&str>) -> Vec<StorageObjectMeta> {
        let mut page: Vec<StorageObjectMeta> = self
            .objects
            .iter()
            .filter(|e| after.is_none_or(|a| e.key().as_str() > a))
            .map(|e| StorageObjectMeta {
                key: e.key().clone(),
                size_bytes: e.value().data.len() as u64,
                last_modified: Some(e.value().last_modified),
                content_type: Some(e.value().content_type.clone()),
            })
            .collect();
        page.sort_by(|a, b| a.key.cmp(&b.key));
        page.truncate(self.page_size);
        page
    }
}

struct Cursor {
    after: Option<String>,
    page_index: usize,
    buffered: std::vec::IntoIter<StorageObjectMeta>,
    done: bool,
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    fn list_objects(&self) -> ObjectStream {
        let store = self.clone();
        let cursor = Cursor {
            after: None,
            page_index: 0,
            buffered: Vec::new().into_iter(),
            done: false,
        };

        Box::pin(stream::unfold(cursor, move |mut cursor| {
            let store = store.clone();
            async move {
                loop {
                    if let Some(item) = cursor.buffered.next() {
                        cursor.after = Some(item.key.clone());
                        return Some((Ok(item), cursor));
                    }
                    if cursor.done {
                        return None;
                    }
                    if cursor.page_index == store.fail_page.load(Ordering::Relaxed) {
                        cursor.done = true;
                        return Some((
                            Err(AppError::storage(format!(
                                "Listing page {} failed",
                                cursor.page_index
                            ))),
                            cursor,
                        ));
                    }
                    let page = store.page_after(cursor.after.as_deref());
                    cursor.page_index += 1;
                    if page.len() < store.page_size {
                        cursor.done = true;
                    }
                    cursor.buffered = page.into_iter();
                }
            }
        }))
    }

    async fn read_handle(&self, key: &str, ttl: Duration) -> AppResult<ReadHandle> {
        if !self.objects.contains_key(key) {
            return Err(AppError::not_found(format!("Object not found: {key}")));
        }
        self.handles_issued.fetch_add(1, Ordering::Relaxed);
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(0));
        Ok(ReadHandle::Url {
            url: format!("memory:///{key}?expires={}", expires_at.timestamp()),
            expires_at,
        })
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        let data = self
            .get(key)
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))?;
        Ok(Box::pin(stream::iter([Ok::<_, std::io::Error>(data)])))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn head(&self, key: &str) -> AppResult<Option<StorageObjectMeta>> {
        Ok(self.objects.get(key).map(|o| StorageObjectMeta {
            key: key.to_string(),
            size_bytes: o.data.len() as u64,
            last_modified: Some(o.last_modified),
            content_type: Some(o.content_type.clone()),
        }))
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<()> {
        let mut object = self
            .objects
            .get(from)
            .map(|o| o.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Object not found: {from}")))?;
        object.last_modified = Utc::now();
        self.objects.insert(to.to_string(), object);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        if self.fail_deletes.load(Ordering::Relaxed) {
            return Err(AppError::storage(format!("Delete of '{key}' failed")));
        }
        self.objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, TryStreamExt};

    #[tokio::test]
    async fn test_listing_spans_pages() {
        let store = MemoryStorageProvider::new(2);
        for key in ["a", "b", "c", "d", "e"] {
            store.put(key, Bytes::from("x"), "text/plain").await.unwrap();
        }
        let keys: Vec<String> = store
            .list_objects()
            .map_ok(|m| m.key)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_listing_failure_ends_stream() {
        let store = MemoryStorageProvider::new(2);
        for key in ["a", "b", "c", "d"] {
            store.put(key, Bytes::from("x"), "text/plain").await.unwrap();
        }
        store.fail_listing_at_page(1);
        let items: Vec<AppResult<StorageObjectMeta>> = store.list_objects().collect().await;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok() && items[1].is_ok());
        assert!(items[2].is_err());
    }

    #[tokio::test]
    async fn test_read_handle_expires_after_ttl() {
        let store = MemoryStorageProvider::default();
        store.put("a.mp4", Bytes::from("x"), "video/mp4").await.unwrap();
        let handle = store
            .read_handle("a.mp4", Duration::from_secs(300))
            .await
            .unwrap();
        assert!(!handle.is_expired());
        assert!(handle.is_expired_at(Utc::now() + chrono::Duration::seconds(301)));
        assert_eq!(store.handles_issued(), 1);
    }
}
