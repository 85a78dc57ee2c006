//! Local filesystem storage provider.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::{
    ByteStream, ObjectStream, ReadHandle, StorageObjectMeta, StorageProvider,
};

use crate::content_type_for;

/// Local filesystem storage provider.
///
/// Keys map to paths under `root`. Read handles are direct paths and never
/// expire.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    root: PathBuf,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Root directory of this provider.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to an absolute path within the root.
    fn resolve(&self, key: &str) -> PathBuf {
        let clean = key.trim_start_matches('/');
        self.root.join(clean)
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

/// Walk state: directories still to read and entries already read.
struct Walk {
    root: PathBuf,
    dirs: Vec<PathBuf>,
    ready: VecDeque<StorageObjectMeta>,
    failed: bool,
}

impl Walk {
    async fn read_dir(&mut self, dir: PathBuf) -> AppResult<()> {
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read directory: {}", dir.display()),
                e,
            )
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read directory entry", e)
        })? {
            let meta = entry.metadata().await?;
            let path = entry.path();
            if meta.is_dir() {
                self.dirs.push(path);
                continue;
            }
            if !meta.is_file() {
                continue;
            }
            let Some(key) = relative_key(&self.root, &path) else {
                continue;
            };
            self.ready.push_back(StorageObjectMeta {
                content_type: Some(content_type_for(&key)),
                key,
                size_bytes: meta.len(),
                last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        Ok(())
    }
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn not_found_or_storage(e: std::io::Error, key: &str, action: &str) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Object not found: {key}"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {action}: {key}"), e)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    fn list_objects(&self) -> ObjectStream {
        let walk = Walk {
            root: self.root.clone(),
            dirs: vec![self.root.clone()],
            ready: VecDeque::new(),
            failed: false,
        };

        Box::pin(stream::unfold(walk, |mut walk| async move {
            loop {
                if walk.failed {
                    return None;
                }
                if let Some(item) = walk.ready.pop_front() {
                    return Some((Ok(item), walk));
                }
                let dir = walk.dirs.pop()?;
                if let Err(e) = walk.read_dir(dir).await {
                    walk.failed = true;
                    return Some((Err(e), walk));
                }
            }
        }))
    }

    async fn read_handle(&self, key: &str, _ttl: Duration) -> AppResult<ReadHandle> {
        let path = self.resolve(key);
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_storage(e, key, "stat object"))?;
        if !meta.is_file() {
            return Err(AppError::not_found(format!("Not a file: {key}")));
        }
        Ok(ReadHandle::Path { path })
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        let file = fs::File::open(self.resolve(key))
            .await
            .map_err(|e| not_found_or_storage(e, key, "open object"))?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> AppResult<()> {
        let full_path = self.resolve(key);
        self.ensure_parent(&full_path).await?;

        fs::write(&full_path, &data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write object: {key}"), e)
        })?;

        debug!(key, bytes = data.len(), "Wrote object");
        Ok(())
    }

    async fn head(&self, key: &str) -> AppResult<Option<StorageObjectMeta>> {
        match fs::metadata(self.resolve(key)).await {
            Ok(meta) if meta.is_file() => Ok(Some(StorageObjectMeta {
                key: key.to_string(),
                size_bytes: meta.len(),
                last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
                content_type: Some(content_type_for(key)),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to stat object: {key}"),
                e,
            )),
        }
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<()> {
        let dest = self.resolve(to);
        self.ensure_parent(&dest).await?;
        fs::copy(self.resolve(from), &dest)
            .await
            .map_err(|e| not_found_or_storage(e, from, "copy object"))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        match fs::remove_file(self.resolve(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete object: {key}"),
                e,
            )),
        }
    }
}
