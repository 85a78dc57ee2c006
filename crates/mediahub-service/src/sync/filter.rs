//! Decides which blob keys belong in the catalog.

use mediahub_core::config::CatalogConfig;
use mediahub_core::traits::transcoder::DerivedKind;

/// Key filter built from catalog configuration.
///
/// Excludes keys with a hidden segment, keys inside a derived-artifact
/// namespace, and keys with a skipped extension.
#[derive(Debug, Clone)]
pub struct KeyFilter {
    hidden_prefix: String,
    skip_extensions: Vec<String>,
    reserved: [&'static str; 2],
}

impl KeyFilter {
    /// Build a filter from configuration.
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            hidden_prefix: config.hidden_prefix.clone(),
            skip_extensions: config
                .skip_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            reserved: [
                DerivedKind::Thumbnail.namespace(),
                DerivedKind::Subtitle.namespace(),
            ],
        }
    }

    /// Whether `key` should be cataloged.
    pub fn accepts(&self, key: &str) -> bool {
        let mut segments = key.split('/').filter(|s| !s.is_empty()).peekable();
        let Some(first) = segments.peek().copied() else {
            return false;
        };
        if self.reserved.contains(&first) {
            return false;
        }

        let mut last = first;
        for segment in segments {
            if !self.hidden_prefix.is_empty() && segment.starts_with(&self.hidden_prefix) {
                return false;
            }
            last = segment;
        }

        match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => !self
                .skip_extensions
                .iter()
                .any(|skip| skip.eq_ignore_ascii_case(ext)),
            _ => true,
        }
    }
}

impl Default for KeyFilter {
    fn default() -> Self {
        Self::from_config(&CatalogConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ordinary_keys() {
        let filter = KeyFilter::default();
        assert!(filter.accepts("movies/show/e01.mp4"));
        assert!(filter.accepts("README"));
        assert!(filter.accepts("docs/thumbnails/a.jpg"));
    }

    #[test]
    fn test_rejects_hidden_segments() {
        let filter = KeyFilter::default();
        assert!(!filter.accepts(".DS_Store"));
        assert!(!filter.accepts("movies/.cache/e01.mp4"));
        assert!(!filter.accepts("a/b/.hidden"));
    }

    #[test]
    fn test_rejects_artifact_namespaces() {
        let filter = KeyFilter::default();
        assert!(!filter.accepts("thumbnails/movies/e01.jpg"));
        assert!(!filter.accepts("subtitles/e01.vtt"));
    }

    #[test]
    fn test_rejects_skipped_extensions() {
        let filter = KeyFilter::default();
        assert!(!filter.accepts("desktop.ini"));
        assert!(!filter.accepts("game/save.DAT"));
        assert!(filter.accepts("data.json"));
    }

    #[test]
    fn test_empty_key() {
        assert!(!KeyFilter::default().accepts(""));
        assert!(!KeyFilter::default().accepts("/"));
    }
}
