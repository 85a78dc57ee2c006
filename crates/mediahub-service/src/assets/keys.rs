//! Locations of derived artifacts.

use std::path::{Path, PathBuf};

use mediahub_core::traits::transcoder::DerivedKind;
use mediahub_core::types::CanonicalPath;

/// Blob key of the `kind` artifact derived from the object at `key`.
///
/// `movies/show/e01.mp4` becomes `thumbnails/movies/show/e01.jpg`.
pub fn derived_key(kind: DerivedKind, key: &CanonicalPath) -> String {
    format!(
        "{}/{}.{}",
        kind.namespace(),
        key.without_extension(),
        kind.extension()
    )
}

/// Directory holding the HLS output for the object at `key`.
///
/// Mirrors the key without its extension so that files with the same
/// stem in different folders never share segments.
pub fn hls_dir(hls_root: &Path, key: &CanonicalPath) -> PathBuf {
    key.without_extension()
        .split('/')
        .fold(hls_root.to_path_buf(), |dir, segment| dir.join(segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_keys() {
        let key = CanonicalPath::object("movies/show/e01.mp4").unwrap();
        assert_eq!(
            derived_key(DerivedKind::Thumbnail, &key),
            "thumbnails/movies/show/e01.jpg"
        );
        assert_eq!(
            derived_key(DerivedKind::Subtitle, &key),
            "subtitles/movies/show/e01.vtt"
        );
    }

    #[test]
    fn test_hls_dirs_do_not_collide() {
        let root = Path::new("/var/hls");
        let a = hls_dir(root, &CanonicalPath::object("a/e01.mp4").unwrap());
        let b = hls_dir(root, &CanonicalPath::object("b/e01.mp4").unwrap());
        assert_eq!(a, PathBuf::from("/var/hls/a/e01"));
        assert_ne!(a, b);
    }
}
