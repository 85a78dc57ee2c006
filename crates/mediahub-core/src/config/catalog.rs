//! Catalog mirroring configuration.

use serde::{Deserialize, Serialize};

/// Controls how blob keys become catalog rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Owner recorded on every row created by a pass.
    #[serde(default = "default_owner")]
    pub owner_id: String,
    /// Prefix joined with an object key to build its canonical URL.
    #[serde(default = "default_public_base")]
    pub public_base_url: String,
    /// Extensions (without the dot) eligible for derived artifacts.
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    /// Extensions (without the dot) never cataloged.
    #[serde(default = "default_skip_extensions")]
    pub skip_extensions: Vec<String>,
    /// Keys with any segment starting with this prefix are never cataloged.
    #[serde(default = "default_hidden_prefix")]
    pub hidden_prefix: String,
    /// Maximum derivations running at once during a pass.
    #[serde(default = "default_derive_concurrency")]
    pub derive_concurrency: usize,
    /// Rows fetched per backfill page.
    #[serde(default = "default_batch_size")]
    pub backfill_batch_size: i64,
    /// Whether rename also moves the underlying object.
    #[serde(default)]
    pub rename_moves_objects: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            owner_id: default_owner(),
            public_base_url: default_public_base(),
            video_extensions: default_video_extensions(),
            skip_extensions: default_skip_extensions(),
            hidden_prefix: default_hidden_prefix(),
            derive_concurrency: default_derive_concurrency(),
            backfill_batch_size: default_batch_size(),
            rename_moves_objects: false,
        }
    }
}

fn default_owner() -> String {
    "default_user".to_string()
}

fn default_public_base() -> String {
    "http://localhost:8080/media_stream?path=".to_string()
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "mkv", "avi", "mov", "webm"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_skip_extensions() -> Vec<String> {
    vec!["ini".to_string(), "dat".to_string()]
}

fn default_hidden_prefix() -> String {
    ".".to_string()
}

fn default_derive_concurrency() -> usize {
    2
}

fn default_batch_size() -> i64 {
    100
}
