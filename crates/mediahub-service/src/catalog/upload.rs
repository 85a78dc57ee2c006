//! Registers objects written through this process.

use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::types::CanonicalPath;
use mediahub_entity::file::{File, NewFile};

use crate::catalog::resolver::PathResolver;
use crate::context::CatalogContext;
use crate::sync::KeyFilter;

/// Writes uploaded objects to the blob store and catalogs them.
#[derive(Debug, Clone)]
pub struct UploadService {
    ctx: CatalogContext,
    resolver: PathResolver,
    filter: KeyFilter,
}

impl UploadService {
    /// Creates an upload service over the given context.
    pub fn new(ctx: CatalogContext) -> Self {
        let resolver = PathResolver::new(ctx.clone());
        let filter = KeyFilter::from_config(&ctx.config.catalog);
        Self {
            ctx,
            resolver,
            filter,
        }
    }

    /// Store `data` as `folder_path/file_name` and catalog it.
    ///
    /// An upload over an already cataloged key replaces the object but
    /// keeps the existing row. Keys a full sync would skip (hidden names,
    /// skipped extensions, derived-artifact namespaces) are rejected.
    pub async fn register_upload(
        &self,
        folder_path: &str,
        file_name: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> AppResult<File> {
        let folder = CanonicalPath::folder(folder_path)?;
        let key = folder.join(file_name)?;
        if !self.filter.accepts(key.as_str()) {
            return Err(AppError::validation(format!(
                "Uploads to '{key}' are not allowed"
            )));
        }

        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| mediahub_storage::content_type_for(key.as_str()));
        let size = data.len();
        self.ctx.storage.put(key.as_str(), data, &content_type).await?;

        let parent_id = self.resolver.resolve_folder(&folder).await?;
        let upserted = self
            .ctx
            .store
            .upsert_file(NewFile {
                owner_id: self.ctx.owner_id().to_string(),
                name: key.name().to_string(),
                path: key.as_str().to_string(),
                size: i64::try_from(size).unwrap_or(i64::MAX),
                url: self.ctx.public_url(key.as_str()),
                file_type: key.extension().map(|e| format!(".{e}")).unwrap_or_default(),
                parent_id,
                created_at: Utc::now(),
            })
            .await?;

        info!(key = %key, bytes = size, inserted = upserted.inserted, "Registered upload");
        Ok(upserted.row)
    }
}
