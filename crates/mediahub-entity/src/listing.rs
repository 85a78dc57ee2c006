//! Listing value objects returned by catalog browsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::file::File;

/// Direct children of a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderListing {
    /// Child folder names.
    pub folders: Vec<String>,
    /// Child files.
    pub files: Vec<FileEntry>,
}

/// A file as it appears in a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// File name.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// Object key relative to the store root.
    pub path: String,
    /// Extension including the leading dot.
    #[serde(rename = "type")]
    pub file_type: String,
    /// Canonical locator.
    pub url: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Thumbnail URL, if derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Subtitle URL, if derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_url: Option<String>,
}

impl From<File> for FileEntry {
    fn from(file: File) -> Self {
        Self {
            name: file.name,
            size: file.size,
            path: file.path,
            file_type: file.file_type,
            url: file.url,
            created_at: file.created_at,
            thumbnail_url: file.thumbnail_url,
            subtitle_url: file.subtitle_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = FileEntry {
            name: "e01.mp4".into(),
            size: 1,
            path: "movies/e01.mp4".into(),
            file_type: ".mp4".into(),
            url: "https://cdn/movies/e01.mp4".into(),
            created_at: Utc::now(),
            thumbnail_url: Some("https://cdn/thumbnails/movies/e01.jpg".into()),
            subtitle_url: None,
        };
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["type"], ".mp4");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("thumbnailUrl").is_some());
        assert!(json.get("subtitleUrl").is_none());
    }
}
