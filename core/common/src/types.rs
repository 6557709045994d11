//! Common types used throughout cloudshare.

use serde::{Deserialize, Deserializer};
use std::fmt;
use zeroize::Zeroize;

/// A folder path on a hierarchical backend, independent of its native IDs.
///
/// Both `/` and `\` separate segments. Empty segments and a bare `.` are
/// dropped, so `""`, `"/"` and `"."` all denote the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderPath {
    segments: Vec<String>,
}

impl FolderPath {
    /// Create a root path.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a path string into a FolderPath.
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
            .map(String::from)
            .collect();
        Self { segments }
    }

    /// Parent directory of an object key (`"a/b/file.txt"` -> `"a/b"`).
    ///
    /// A key ending in a separator names the directory itself
    /// (`"a/b/"` -> `"a/b"`).
    pub fn parent_of_key(key: &str) -> Self {
        let mut path = Self::parse(key);
        if !key.ends_with(['/', '\\']) {
            path.segments.pop();
        }
        path
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The path made of the first `depth` segments, rendered with `/`.
    pub fn prefix(&self, depth: usize) -> String {
        self.segments[..depth.min(self.segments.len())].join("/")
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

/// Credential material that is wiped from memory on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Secret::new)
    }
}
