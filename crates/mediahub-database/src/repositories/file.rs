//! File repository implementation.

use sqlx::PgPool;

use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::result::AppResult;
use mediahub_core::types::{FileId, FolderId};
use mediahub_entity::file::{AssetUpdate, File, NewFile};

use super::INSERT_ATTEMPTS;
use crate::catalog::Upserted;

/// Repository for file rows keyed by URL.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a file by ID.
    pub async fn find_by_id(&self, id: FileId) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    /// Find a file by its canonical URL.
    pub async fn find_by_url(&self, url: &str) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE url = $1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file by url", e))
    }

    /// Insert a file unless its URL is already cataloged. Never overwrites.
    pub async fn insert_if_absent(&self, data: &NewFile) -> AppResult<Upserted<File>> {
        for _ in 0..INSERT_ATTEMPTS {
            let inserted = sqlx::query_as::<_, File>(
                "INSERT INTO files (id, owner_id, name, path, size, url, type, parent_id, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 ON CONFLICT (url) DO NOTHING RETURNING *",
            )
            .bind(FileId::new())
            .bind(&data.owner_id)
            .bind(&data.name)
            .bind(&data.path)
            .bind(data.size)
            .bind(&data.url)
            .bind(&data.file_type)
            .bind(data.parent_id)
            .bind(data.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::not_found(format!("Folder for file '{}' does not exist", data.path))
                }
                _ => AppError::with_source(ErrorKind::Database, "Failed to create file", e),
            })?;

            if let Some(row) = inserted {
                return Ok(Upserted::inserted(row));
            }
            if let Some(row) = self.find_by_url(&data.url).await? {
                return Ok(Upserted::existing(row));
            }
        }

        Err(AppError::conflict(format!(
            "File '{}' kept conflicting without a visible row",
            data.url
        )))
    }

    /// Write non-null asset pointers, leaving the others untouched.
    pub async fn update_assets(&self, id: FileId, update: &AssetUpdate) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET \
                thumbnail_url = COALESCE($2, thumbnail_url), \
                subtitle_url = COALESCE($3, subtitle_url) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(update.thumbnail_url.as_deref())
        .bind(update.subtitle_url.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update file assets", e))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// List files directly inside a folder, ordered by name.
    pub async fn find_in_folder(&self, parent_id: FolderId) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE parent_id = $1 ORDER BY name ASC")
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    /// Page through files of the given types missing either asset pointer.
    ///
    /// `file_types` are dotted, lowercase extensions. Paging is keyset on
    /// `id`, starting after `after`.
    pub async fn find_missing_assets(
        &self,
        after: Option<FileId>,
        limit: i64,
        file_types: &[String],
    ) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE (thumbnail_url IS NULL OR subtitle_url IS NULL) \
               AND lower(type) = ANY($1) \
               AND ($2::uuid IS NULL OR id > $2) \
             ORDER BY id ASC LIMIT $3",
        )
        .bind(file_types)
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to query files missing assets", e)
        })
    }

    /// Rename a file in place, updating its name, key, and URL.
    pub async fn rename(
        &self,
        id: FileId,
        new_name: &str,
        new_path: &str,
        new_url: &str,
    ) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET name = $2, path = $3, url = $4 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new_name)
        .bind(new_path)
        .bind(new_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("files_url_key") => {
                AppError::conflict(format!("A file already exists at '{new_url}'"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to rename file", e),
        })?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// Count all cataloged files.
    pub async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count files", e))?;
        Ok(count as u64)
    }
}
