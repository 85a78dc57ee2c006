//! Folder repository implementation.

use sqlx::PgPool;

use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::result::AppResult;
use mediahub_core::types::FolderId;
use mediahub_entity::folder::{Folder, NewFolder};

use super::INSERT_ATTEMPTS;
use crate::catalog::Upserted;

/// Repository for folder lookups and idempotent creation.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a folder by ID.
    pub async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    /// Find a folder by its canonical path.
    pub async fn find_by_path(&self, path: &str) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE path = $1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find folder by path", e)
            })
    }

    /// Insert a folder unless its path already exists.
    ///
    /// On conflict the existing row is returned with `inserted = false`.
    pub async fn insert_if_absent(&self, data: &NewFolder) -> AppResult<Upserted<Folder>> {
        for _ in 0..INSERT_ATTEMPTS {
            let inserted = sqlx::query_as::<_, Folder>(
                "INSERT INTO folders (id, owner_id, name, path, parent_id) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (path) DO NOTHING RETURNING *",
            )
            .bind(FolderId::new())
            .bind(&data.owner_id)
            .bind(&data.name)
            .bind(&data.path)
            .bind(data.parent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::not_found(format!("Parent of folder '{}' does not exist", data.path))
                }
                _ => AppError::with_source(ErrorKind::Database, "Failed to create folder", e),
            })?;

            if let Some(row) = inserted {
                return Ok(Upserted::inserted(row));
            }
            if let Some(row) = self.find_by_path(&data.path).await? {
                return Ok(Upserted::existing(row));
            }
        }

        Err(AppError::conflict(format!(
            "Folder '{}' kept conflicting without a visible row",
            data.path
        )))
    }

    /// List direct child folders, ordered by name.
    pub async fn find_children(&self, parent_id: FolderId) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE parent_id = $1 ORDER BY name ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list child folders", e))
    }

    /// Count all folders, root included.
    pub async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count folders", e))?;
        Ok(count as u64)
    }
}
