//! Maps canonical folder paths to folder ids, creating ancestors on demand.

use tracing::debug;

use mediahub_core::result::AppResult;
use mediahub_core::types::{CanonicalPath, FolderId};
use mediahub_entity::folder::NewFolder;

use crate::context::CatalogContext;

/// Resolves folder paths against the catalog.
///
/// Concurrent resolvers of the same path converge on one row: the store's
/// insert-if-absent returns the winner's row to every loser. When an insert
/// fails, ancestors created before it stay in place and the next call
/// resumes from the first missing segment.
#[derive(Debug, Clone)]
pub struct PathResolver {
    ctx: CatalogContext,
}

impl PathResolver {
    /// Creates a resolver over the given context.
    pub fn new(ctx: CatalogContext) -> Self {
        Self { ctx }
    }

    /// Return the id of the folder at `path`, creating it and any missing
    /// ancestors. The root is created on first use.
    ///
    /// Any canonical path resolves; segments are not held to the rules for
    /// user-supplied names.
    pub async fn resolve_folder(&self, path: &CanonicalPath) -> AppResult<FolderId> {
        if let Some(folder) = self.ctx.store.find_folder_by_path(path.as_str()).await? {
            return Ok(folder.id);
        }

        let mut parent_id = self.ensure(&CanonicalPath::root(), None).await?;
        for prefix in path.prefixes() {
            parent_id = self.ensure(&prefix, Some(parent_id)).await?;
        }
        Ok(parent_id)
    }

    /// Resolve the folder containing the object at `key`.
    pub async fn resolve_parent(&self, key: &CanonicalPath) -> AppResult<FolderId> {
        let parent = key.parent().unwrap_or_default();
        self.resolve_folder(&parent).await
    }

    async fn ensure(&self, path: &CanonicalPath, parent_id: Option<FolderId>) -> AppResult<FolderId> {
        if let Some(folder) = self.ctx.store.find_folder_by_path(path.as_str()).await? {
            return Ok(folder.id);
        }

        let upserted = self
            .ctx
            .store
            .insert_folder(NewFolder::at(path, parent_id, self.ctx.owner_id()))
            .await?;
        if upserted.inserted {
            debug!(path = %path, folder_id = %upserted.row.id, "Created folder");
        }
        Ok(upserted.row.id)
    }
}
