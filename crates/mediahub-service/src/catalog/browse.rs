//! Read and rename operations over the catalog.

use tracing::{info, warn};

use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::ByteStream;
use mediahub_core::types::{CanonicalPath, validate_name};
use mediahub_entity::file::File;
use mediahub_entity::listing::{FileEntry, FolderListing};

use crate::context::CatalogContext;

/// Where a cataloged file's bytes can be fetched.
pub enum FileLocation {
    /// Fetch from this URL.
    Redirect(String),
    /// Bytes served through this process.
    Stream {
        /// File name.
        name: String,
        /// Size in bytes.
        size: i64,
        /// MIME type.
        content_type: String,
        /// Object contents.
        body: ByteStream,
    },
}

impl std::fmt::Debug for FileLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redirect(url) => f.debug_tuple("Redirect").field(url).finish(),
            Self::Stream {
                name,
                size,
                content_type,
                ..
            } => f
                .debug_struct("Stream")
                .field("name", name)
                .field("size", size)
                .field("content_type", content_type)
                .finish_non_exhaustive(),
        }
    }
}

/// Outcome of a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedFile {
    /// Key before the rename.
    pub old_path: String,
    /// Key after the rename.
    pub new_path: String,
    /// The updated row.
    pub file: File,
}

/// Lists folders, resolves files, and renames them.
#[derive(Debug, Clone)]
pub struct CatalogBrowser {
    ctx: CatalogContext,
}

impl CatalogBrowser {
    /// Creates a browser over the given context.
    pub fn new(ctx: CatalogContext) -> Self {
        Self { ctx }
    }

    /// Direct children of the folder at `path` (empty for the root).
    pub async fn list_folder(&self, path: &str) -> AppResult<FolderListing> {
        let path = CanonicalPath::folder(path)?;
        let folder = self
            .ctx
            .store
            .find_folder_by_path(path.as_str())
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder not found: '{path}'")))?;

        let children = self.ctx.store.list_children(folder.id).await?;
        Ok(FolderListing {
            folders: children
                .folders
                .into_iter()
                .filter(|f| !f.is_root())
                .map(|f| f.name)
                .collect(),
            files: children.files.into_iter().map(FileEntry::from).collect(),
        })
    }

    /// Locate the bytes of the cataloged file at `path`.
    ///
    /// Redirect-capable backends answer with the file URL; the others
    /// stream the object through.
    pub async fn resolve_file(&self, path: &str) -> AppResult<FileLocation> {
        let key = CanonicalPath::object(path)?;
        let file = self.find_file(&key).await?;

        if self.ctx.config.storage.backend.redirects() {
            return Ok(FileLocation::Redirect(file.url));
        }

        let body = self.ctx.storage.read(key.as_str()).await?;
        Ok(FileLocation::Stream {
            content_type: mediahub_storage::content_type_for(key.as_str()),
            name: file.name,
            size: file.size,
            body,
        })
    }

    /// Rename the file at `path` to `new_name` plus its original extension.
    pub async fn rename_file(&self, path: &str, new_name: &str) -> AppResult<RenamedFile> {
        let key = CanonicalPath::object(path)?;
        let new_name = new_name.trim();
        validate_name(new_name)?;

        let file = self.find_file(&key).await?;
        let new_base = format!("{new_name}{}", file.file_type);
        let new_key = key.parent().unwrap_or_default().join(&new_base)?;
        let new_url = self.ctx.public_url(new_key.as_str());

        if self.ctx.store.find_file_by_url(&new_url).await?.is_some() {
            return Err(AppError::conflict(format!(
                "A file already exists at '{new_key}'"
            )));
        }

        let moves = self.ctx.config.catalog.rename_moves_objects;
        if moves {
            self.ctx.storage.copy(key.as_str(), new_key.as_str()).await?;
        }

        let renamed = match self
            .ctx
            .store
            .rename_file(file.id, &new_base, new_key.as_str(), &new_url)
            .await
        {
            Ok(renamed) => renamed,
            Err(e) => {
                if moves {
                    if let Err(cleanup) = self.ctx.storage.delete(new_key.as_str()).await {
                        warn!(key = %new_key, error = %cleanup, "Failed to remove copied object");
                    }
                }
                return Err(e);
            }
        };

        // The row and the copy are already committed.
        if moves {
            if let Err(e) = self.ctx.storage.delete(key.as_str()).await {
                warn!(key = %key, error = %e, "Failed to remove renamed object");
            }
        }

        info!(old = %key, new = %new_key, file_id = %file.id, "Renamed file");
        Ok(RenamedFile {
            old_path: key.to_string(),
            new_path: new_key.to_string(),
            file: renamed,
        })
    }

    async fn find_file(&self, key: &CanonicalPath) -> AppResult<File> {
        let url = self.ctx.public_url(key.as_str());
        self.ctx
            .store
            .find_file_by_url(&url)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File not found: '{key}'")))
    }
}
