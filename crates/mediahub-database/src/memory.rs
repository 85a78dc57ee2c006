//! In-memory catalog store backed by `DashMap`.
//!
//! Mirrors the PostgreSQL constraints that the rest of the system relies
//! on: unique folder paths, unique file URLs, parents that must exist, and
//! coalescing asset updates.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::types::{FileId, FolderId};
use mediahub_entity::file::{AssetUpdate, File, NewFile};
use mediahub_entity::folder::{Folder, NewFolder};

use crate::catalog::{CatalogStore, ChildEntries, Upserted};

/// Catalog store kept entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    folders: Arc<DashMap<String, Folder>>,
    files: Arc<DashMap<FileId, File>>,
    file_urls: Arc<DashMap<String, FileId>>,
    failing_folders: Arc<DashMap<String, ()>>,
    asset_updates: Arc<AtomicU64>,
}

impl MemoryCatalogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert of the folder at `path` fail with a database error.
    pub fn fail_folder_inserts(&self, path: &str) {
        self.failing_folders.insert(path.to_string(), ());
    }

    /// Undo [`fail_folder_inserts`](Self::fail_folder_inserts).
    pub fn clear_folder_failures(&self) {
        self.failing_folders.clear();
    }

    /// All folders, ordered by path.
    pub fn all_folders(&self) -> Vec<Folder> {
        let mut folders: Vec<Folder> = self.folders.iter().map(|e| e.value().clone()).collect();
        folders.sort_by(|a, b| a.path.cmp(&b.path));
        folders
    }

    /// All files, ordered by key.
    pub fn all_files(&self) -> Vec<File> {
        let mut files: Vec<File> = self.files.iter().map(|e| e.value().clone()).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Number of coalescing updates applied so far.
    pub fn asset_update_count(&self) -> u64 {
        self.asset_updates.load(Ordering::Relaxed)
    }

    fn folder_exists(&self, id: FolderId) -> bool {
        self.folders.iter().any(|e| e.value().id == id)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn find_folder_by_path(&self, path: &str) -> AppResult<Option<Folder>> {
        Ok(self.folders.get(path).map(|f| f.value().clone()))
    }

    async fn insert_folder(&self, data: NewFolder) -> AppResult<Upserted<Folder>> {
        if self.failing_folders.contains_key(&data.path) {
            return Err(AppError::database(format!(
                "Injected failure inserting folder '{}'",
                data.path
            )));
        }
        if let Some(parent_id) = data.parent_id {
            if !self.folder_exists(parent_id) {
                return Err(AppError::not_found(format!(
                    "Parent of folder '{}' does not exist",
                    data.path
                )));
            }
        }

        match self.folders.entry(data.path.clone()) {
            Entry::Occupied(existing) => Ok(Upserted::existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                let folder = data.into_folder(FolderId::new(), Utc::now());
                slot.insert(folder.clone());
                Ok(Upserted::inserted(folder))
            }
        }
    }

    async fn find_file_by_url(&self, url: &str) -> AppResult<Option<File>> {
        let Some(id) = self.file_urls.get(url).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.files.get(&id).map(|f| f.value().clone()))
    }

    async fn upsert_file(&self, data: NewFile) -> AppResult<Upserted<File>> {
        if !self.folder_exists(data.parent_id) {
            return Err(AppError::not_found(format!(
                "Folder for file '{}' does not exist",
                data.path
            )));
        }

        let id = match self.file_urls.entry(data.url.clone()) {
            Entry::Occupied(existing) => *existing.get(),
            Entry::Vacant(slot) => {
                let file = data.into_file(FileId::new());
                let id = file.id;
                self.files.insert(id, file.clone());
                slot.insert(id);
                return Ok(Upserted::inserted(file));
            }
        };

        self.files
            .get(&id)
            .map(|f| Upserted::existing(f.value().clone()))
            .ok_or_else(|| AppError::internal(format!("URL index points at missing file {id}")))
    }

    async fn update_file_assets(&self, id: FileId, update: AssetUpdate) -> AppResult<File> {
        let mut file = self
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        update.apply_to(file.value_mut());
        self.asset_updates.fetch_add(1, Ordering::Relaxed);
        Ok(file.value().clone())
    }

    async fn list_children(&self, folder_id: FolderId) -> AppResult<ChildEntries> {
        let mut folders: Vec<Folder> = self
            .folders
            .iter()
            .filter(|e| e.value().parent_id == Some(folder_id))
            .map(|e| e.value().clone())
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));

        let mut files: Vec<File> = self
            .files
            .iter()
            .filter(|e| e.value().parent_id == folder_id)
            .map(|e| e.value().clone())
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ChildEntries { folders, files })
    }

    async fn find_missing_assets(
        &self,
        after: Option<FileId>,
        limit: i64,
        file_types: &[String],
    ) -> AppResult<Vec<File>> {
        let mut files: Vec<File> = self
            .files
            .iter()
            .map(|e| e.value().clone())
            .filter(|f| f.is_missing_assets())
            .filter(|f| file_types.contains(&f.file_type.to_lowercase()))
            .filter(|f| after.is_none_or(|a| f.id > a))
            .collect();
        files.sort_by_key(|f| f.id);
        files.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(files)
    }

    async fn rename_file(
        &self,
        id: FileId,
        new_name: &str,
        new_path: &str,
        new_url: &str,
    ) -> AppResult<File> {
        let old_url = self
            .files
            .get(&id)
            .map(|f| f.value().url.clone())
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;

        if old_url != new_url {
            match self.file_urls.entry(new_url.to_string()) {
                Entry::Occupied(_) => {
                    return Err(AppError::conflict(format!(
                        "A file already exists at '{new_url}'"
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            self.file_urls.remove(&old_url);
        }

        let mut file = self
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        let row = file.value_mut();
        row.name = new_name.to_string();
        row.path = new_path.to_string();
        row.url = new_url.to_string();
        Ok(row.clone())
    }

    async fn counts(&self) -> AppResult<(u64, u64)> {
        Ok((self.folders.len() as u64, self.files.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediahub_core::error::ErrorKind;
    use mediahub_core::types::CanonicalPath;

    async fn root(store: &MemoryCatalogStore) -> Folder {
        store
            .insert_folder(NewFolder::at(&CanonicalPath::root(), None, "default_user"))
            .await
            .unwrap()
            .row
    }

    fn new_file(parent: FolderId, key: &str) -> NewFile {
        NewFile {
            owner_id: "default_user".into(),
            name: key.rsplit('/').next().unwrap().into(),
            path: key.into(),
            size: 10,
            url: format!("https://cdn/{key}"),
            file_type: ".mp4".into(),
            parent_id: parent,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_folder_is_idempotent() {
        let store = MemoryCatalogStore::new();
        let first = store
            .insert_folder(NewFolder::at(&CanonicalPath::root(), None, "default_user"))
            .await
            .unwrap();
        let second = store
            .insert_folder(NewFolder::at(&CanonicalPath::root(), None, "default_user"))
            .await
            .unwrap();
        assert!(first.inserted);
        assert!(!second.inserted);
        assert_eq!(first.row.id, second.row.id);
        assert_eq!(store.counts().await.unwrap(), (1, 0));
    }

    #[tokio::test]
    async fn test_folder_requires_existing_parent() {
        let store = MemoryCatalogStore::new();
        let path = CanonicalPath::folder("movies").unwrap();
        let err = store
            .insert_folder(NewFolder::at(&path, Some(FolderId::new()), "default_user"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_upsert_file_never_overwrites() {
        let store = MemoryCatalogStore::new();
        let root = root(&store).await;
        let first = store.upsert_file(new_file(root.id, "a.mp4")).await.unwrap();
        let mut changed = new_file(root.id, "a.mp4");
        changed.size = 999;
        let second = store.upsert_file(changed).await.unwrap();
        assert!(first.inserted);
        assert!(!second.inserted);
        assert_eq!(second.row.size, 10);
    }

    #[tokio::test]
    async fn test_missing_assets_pagination() {
        let store = MemoryCatalogStore::new();
        let root = root(&store).await;
        for i in 0..5 {
            store
                .upsert_file(new_file(root.id, &format!("v{i}.mp4")))
                .await
                .unwrap();
        }
        let types = vec![".mp4".to_string()];
        let page1 = store.find_missing_assets(None, 3, &types).await.unwrap();
        assert_eq!(page1.len(), 3);
        let page2 = store
            .find_missing_assets(page1.last().map(|f| f.id), 3, &types)
            .await
            .unwrap();
        assert_eq!(page2.len(), 2);
        assert!(page2.iter().all(|f| f.id > page1[2].id));
    }

    #[tokio::test]
    async fn test_rename_conflict() {
        let store = MemoryCatalogStore::new();
        let root = root(&store).await;
        let a = store.upsert_file(new_file(root.id, "a.mp4")).await.unwrap().row;
        store.upsert_file(new_file(root.id, "b.mp4")).await.unwrap();

        let err = store
            .rename_file(a.id, "b.mp4", "b.mp4", "https://cdn/b.mp4")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let renamed = store
            .rename_file(a.id, "c.mp4", "c.mp4", "https://cdn/c.mp4")
            .await
            .unwrap();
        assert_eq!(renamed.name, "c.mp4");
        assert!(store.find_file_by_url("https://cdn/a.mp4").await.unwrap().is_none());
        assert!(store.find_file_by_url("https://cdn/c.mp4").await.unwrap().is_some());
    }
}
