//! File entity model.

use chrono::{DateTime, Utc};
use mediahub_core::types::{FileId, FolderId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A cataloged object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: FileId,
    /// The file owner.
    pub owner_id: String,
    /// The file name (including extension).
    pub name: String,
    /// Object key relative to the store root.
    pub path: String,
    /// Size in bytes.
    pub size: i64,
    /// Canonical, globally unique locator.
    pub url: String,
    /// Extension including the leading dot (e.g. `.mp4`), or empty.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub file_type: String,
    /// The folder containing this file.
    pub parent_id: FolderId,
    /// Source modification time at first sighting.
    pub created_at: DateTime<Utc>,
    /// URL of the stored thumbnail, if derived.
    pub thumbnail_url: Option<String>,
    /// URL of the stored subtitle track, if derived.
    pub subtitle_url: Option<String>,
}

impl File {
    /// Extension without the dot, lowercased.
    pub fn extension(&self) -> Option<String> {
        self.file_type
            .strip_prefix('.')
            .filter(|ext| !ext.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether either derived-asset pointer is still unset.
    pub fn is_missing_assets(&self) -> bool {
        self.thumbnail_url.is_none() || self.subtitle_url.is_none()
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    /// The file owner.
    pub owner_id: String,
    /// The file name.
    pub name: String,
    /// Object key.
    pub path: String,
    /// Size in bytes.
    pub size: i64,
    /// Canonical locator (natural key).
    pub url: String,
    /// Extension including the leading dot.
    pub file_type: String,
    /// The containing folder.
    pub parent_id: FolderId,
    /// Creation timestamp to record.
    pub created_at: DateTime<Utc>,
}

impl NewFile {
    /// Materialize the row this payload would insert.
    pub fn into_file(self, id: FileId) -> File {
        File {
            id,
            owner_id: self.owner_id,
            name: self.name,
            path: self.path,
            size: self.size,
            url: self.url,
            file_type: self.file_type,
            parent_id: self.parent_id,
            created_at: self.created_at,
            thumbnail_url: None,
            subtitle_url: None,
        }
    }
}

/// Coalescing update of derived-asset pointers. `None` leaves a column as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUpdate {
    /// New thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// New subtitle URL.
    pub subtitle_url: Option<String>,
}

impl AssetUpdate {
    /// Whether the update would write nothing.
    pub fn is_empty(&self) -> bool {
        self.thumbnail_url.is_none() && self.subtitle_url.is_none()
    }

    /// Apply to an in-memory row with the same coalescing rule as the store.
    pub fn apply_to(&self, file: &mut File) {
        if let Some(url) = &self.thumbnail_url {
            file.thumbnail_url = Some(url.clone());
        }
        if let Some(url) = &self.subtitle_url {
            file.subtitle_url = Some(url.clone());
        }
    }
}
