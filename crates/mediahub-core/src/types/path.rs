//! Canonical relative paths shared by folders, files, and object keys.
//!
//! A [`CanonicalPath`] is slash-joined, has no leading or trailing slash,
//! no empty or `.` segments, and never contains `..`. The empty path is
//! the catalog root. Every path-accepting operation parses its input
//! through here before touching the catalog or the blob store.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::AppError;
use crate::result::AppResult;

/// A validated, normalized relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// The root path (`""`).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse a folder path. Empty input and `.` resolve to the root.
    pub fn folder(raw: &str) -> AppResult<Self> {
        normalize(raw).map(Self)
    }

    /// Parse a path that must name an object (file or key).
    pub fn object(raw: &str) -> AppResult<Self> {
        let normalized = normalize(raw)?;
        if normalized.is_empty() {
            return Err(AppError::validation("File path must not be empty"));
        }
        Ok(Self(normalized))
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments. The root has none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Last segment, or `""` for the root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The containing path. The root has no parent.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rfind('/') {
            Some(idx) => Self(self.0[..idx].to_string()),
            None => Self::root(),
        })
    }

    /// Every non-root prefix of this path, shortest first.
    ///
    /// `a/b/c` yields `a`, `a/b`, `a/b/c`. Segments are taken as they are;
    /// they need not be valid names for [`join`](Self::join).
    pub fn prefixes(&self) -> impl Iterator<Item = CanonicalPath> + '_ {
        let end = (!self.is_root()).then_some(self.0.len());
        self.0
            .match_indices('/')
            .map(|(idx, _)| idx)
            .chain(end)
            .map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Append a single validated segment.
    pub fn join(&self, segment: &str) -> AppResult<Self> {
        validate_name(segment)?;
        if self.is_root() {
            Ok(Self(segment.to_string()))
        } else {
            Ok(Self(format!("{}/{}", self.0, segment)))
        }
    }

    /// Extension of the last segment without the dot, if any.
    ///
    /// Dotfiles such as `.hidden` have no extension.
    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// The path with the extension of the last segment removed.
    pub fn without_extension(&self) -> &str {
        match self.extension() {
            Some(ext) => &self.0[..self.0.len() - ext.len() - 1],
            None => &self.0,
        }
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for CanonicalPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Validate a single name segment (file or folder name).
///
/// Names must be non-empty, must not be `.` or `..`, and must not contain
/// separators, drive markers, or control characters.
pub fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Name must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(AppError::validation(format!("Invalid name '{name}'")));
    }
    if name.contains(['/', '\\', ':']) {
        return Err(AppError::validation(format!(
            "Name '{name}' must not contain '/', '\\' or ':'"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AppError::validation("Name must not contain control characters"));
    }
    Ok(())
}

fn normalize(raw: &str) -> AppResult<String> {
    if raw.chars().any(char::is_control) {
        return Err(AppError::validation("Path must not contain control characters"));
    }
    let unified = raw.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(AppError::validation(format!(
                    "Path '{raw}' must not contain '..'"
                )));
            }
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}
