//! Folder entity model.

use chrono::{DateTime, Utc};
use mediahub_core::types::{CanonicalPath, FolderId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A folder in the mirrored hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// The folder owner.
    pub owner_id: String,
    /// Last path segment (`""` for the root).
    pub name: String,
    /// Canonical slash-joined path (`""` for the root).
    pub path: String,
    /// Parent folder ID (null only for the root).
    pub parent_id: Option<FolderId>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this is the root folder.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFolder {
    /// The folder owner.
    pub owner_id: String,
    /// Last path segment.
    pub name: String,
    /// Canonical path.
    pub path: String,
    /// Parent folder (None only for the root).
    pub parent_id: Option<FolderId>,
}

impl NewFolder {
    /// Payload for the folder at `path` under `parent_id`.
    pub fn at(path: &CanonicalPath, parent_id: Option<FolderId>, owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            name: path.name().to_string(),
            path: path.as_str().to_string(),
            parent_id,
        }
    }

    /// Materialize the row this payload would insert.
    pub fn into_folder(self, id: FolderId, created_at: DateTime<Utc>) -> Folder {
        Folder {
            id,
            owner_id: self.owner_id,
            name: self.name,
            path: self.path,
            parent_id: self.parent_id,
            created_at,
        }
    }
}
