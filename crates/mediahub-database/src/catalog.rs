//! The catalog persistence boundary.
//!
//! Callers address rows by natural key (folder `path`, file `url`); the
//! store owns identifier generation. Inserts are insert-if-absent and
//! asset updates are coalescing, so overlapping passes never duplicate
//! rows or clobber each other's pointers.

use async_trait::async_trait;
use sqlx::PgPool;

use mediahub_core::result::AppResult;
use mediahub_core::types::{FileId, FolderId};
use mediahub_entity::file::{AssetUpdate, File, NewFile};
use mediahub_entity::folder::{Folder, NewFolder};

use crate::repositories::{FileRepository, FolderRepository};

/// Outcome of an insert-if-absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted<T> {
    /// The row now stored under the natural key.
    pub row: T,
    /// Whether this call created it.
    pub inserted: bool,
}

impl<T> Upserted<T> {
    /// A row created by this call.
    pub fn inserted(row: T) -> Self {
        Self {
            row,
            inserted: true,
        }
    }

    /// A row that already existed.
    pub fn existing(row: T) -> Self {
        Self {
            row,
            inserted: false,
        }
    }
}

/// Direct children of a folder.
#[derive(Debug, Clone, Default)]
pub struct ChildEntries {
    /// Child folders, ordered by name.
    pub folders: Vec<Folder>,
    /// Child files, ordered by name.
    pub files: Vec<File>,
}

/// Persistence operations used by the resolver, orchestrator, and browser.
#[async_trait]
pub trait CatalogStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a folder by canonical path.
    async fn find_folder_by_path(&self, path: &str) -> AppResult<Option<Folder>>;

    /// Insert a folder unless one exists at the same path.
    async fn insert_folder(&self, data: NewFolder) -> AppResult<Upserted<Folder>>;

    /// Find a file by canonical URL.
    async fn find_file_by_url(&self, url: &str) -> AppResult<Option<File>>;

    /// Insert a file unless one exists with the same URL. Never overwrites.
    async fn upsert_file(&self, data: NewFile) -> AppResult<Upserted<File>>;

    /// Write only the non-null pointers of `update`.
    async fn update_file_assets(&self, id: FileId, update: AssetUpdate) -> AppResult<File>;

    /// Direct child folders and files of `folder_id`.
    async fn list_children(&self, folder_id: FolderId) -> AppResult<ChildEntries>;

    /// Files of the given dotted lowercase types missing either pointer,
    /// ordered by id and starting after `after`.
    async fn find_missing_assets(
        &self,
        after: Option<FileId>,
        limit: i64,
        file_types: &[String],
    ) -> AppResult<Vec<File>>;

    /// Change a file's name, key, and URL. `Conflict` if the URL is taken.
    async fn rename_file(
        &self,
        id: FileId,
        new_name: &str,
        new_path: &str,
        new_url: &str,
    ) -> AppResult<File>;

    /// Row counts as `(folders, files)`.
    async fn counts(&self) -> AppResult<(u64, u64)>;
}

/// PostgreSQL-backed catalog store.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    folders: FolderRepository,
    files: FileRepository,
}

impl PgCatalogStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            folders: FolderRepository::new(pool.clone()),
            files: FileRepository::new(pool),
        }
    }

    /// Folder repository.
    pub fn folders(&self) -> &FolderRepository {
        &self.folders
    }

    /// File repository.
    pub fn files(&self) -> &FileRepository {
        &self.files
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_folder_by_path(&self, path: &str) -> AppResult<Option<Folder>> {
        self.folders.find_by_path(path).await
    }

    async fn insert_folder(&self, data: NewFolder) -> AppResult<Upserted<Folder>> {
        self.folders.insert_if_absent(&data).await
    }

    async fn find_file_by_url(&self, url: &str) -> AppResult<Option<File>> {
        self.files.find_by_url(url).await
    }

    async fn upsert_file(&self, data: NewFile) -> AppResult<Upserted<File>> {
        self.files.insert_if_absent(&data).await
    }

    async fn update_file_assets(&self, id: FileId, update: AssetUpdate) -> AppResult<File> {
        self.files.update_assets(id, &update).await
    }

    async fn list_children(&self, folder_id: FolderId) -> AppResult<ChildEntries> {
        let folders = self.folders.find_children(folder_id).await?;
        let files = self.files.find_in_folder(folder_id).await?;
        Ok(ChildEntries { folders, files })
    }

    async fn find_missing_assets(
        &self,
        after: Option<FileId>,
        limit: i64,
        file_types: &[String],
    ) -> AppResult<Vec<File>> {
        self.files.find_missing_assets(after, limit, file_types).await
    }

    async fn rename_file(
        &self,
        id: FileId,
        new_name: &str,
        new_path: &str,
        new_url: &str,
    ) -> AppResult<File> {
        self.files.rename(id, new_name, new_path, new_url).await
    }

    async fn counts(&self) -> AppResult<(u64, u64)> {
        Ok((self.folders.count().await?, self.files.count().await?))
    }
}
