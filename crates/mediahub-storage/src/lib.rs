//! # mediahub-storage
//!
//! Blob store implementations for MediaHub: an S3-compatible provider
//! (behind the `s3` feature), a local directory tree, and an in-memory
//! store. [`build_provider`] picks one from configuration.

pub mod factory;
pub mod providers;

pub use factory::build_provider;
pub use providers::{LocalStorageProvider, MemoryStorageProvider};

/// Best-effort MIME type for an object key.
pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("movies/a.mp4"), "video/mp4");
        assert_eq!(content_type_for("thumbnails/a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
