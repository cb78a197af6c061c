//! Normalized workspace paths
//!
//! Provides [`WorkspacePath`], the key type of the virtual file system.
//! Paths are POSIX-style, case-sensitive and always rooted at `/`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Normalized path inside the workspace tree
///
/// Stored as segments so that ordering groups a directory's entries together
/// (`/a/b` sorts before `/a-b`).
///
/// # Normalization
/// - `\\` is not a separator; only `/` splits segments
/// - empty segments (`//`) and `.` are dropped
/// - `..` pops the previous segment and fails if it would leave the root
/// - a trailing `/` is dropped
///
/// # Examples
/// - `src//main.rs` → `/src/main.rs`
/// - `/a/./b/../c/` → `/a/c`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WorkspacePath(Vec<String>);

impl WorkspacePath {
    /// The workspace root (`/`)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Normalize raw path text
    ///
    /// # Errors
    /// - [`PathError::EscapesRoot`] if `..` climbs above `/`
    /// - [`PathError::InvalidCharacter`] for NUL or other control characters
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if let Some(ch) = raw.chars().find(|c| c.is_control()) {
            return Err(PathError::InvalidCharacter {
                path: raw.escape_debug().to_string(),
                ch,
            });
        }

        let mut segments: Vec<String> = Vec::new();
        for seg in raw.split('/') {
            match seg {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(PathError::EscapesRoot(raw.to_string()));
                    }
                }
                other => segments.push(other.to_string()),
            }
        }
        Ok(Self(segments))
    }

    /// Path segments from root to leaf
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments (0 for root)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Check if this is the root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Parent directory (None for root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Final segment
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Extension of the final segment, without the dot
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Append a segment, returning new path
    ///
    /// The segment is used verbatim; callers pass already-split names.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Strict ancestor check (`/a` is an ancestor of `/a/b`, not of `/a`)
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// All strict ancestors from the root's first child down to the parent
    ///
    /// `/a/b/c` yields `/a`, `/a/b`.
    pub fn ancestors(&self) -> impl Iterator<Item = WorkspacePath> + '_ {
        (1..self.0.len()).map(move |n| Self(self.0[..n].to_vec()))
    }
}

impl Display for WorkspacePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.0 {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for WorkspacePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for WorkspacePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for WorkspacePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Errors related to workspace paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// `..` climbed above the root
    #[error("path escapes the workspace root: {0}")]
    EscapesRoot(String),

    /// Control character in path text
    #[error("invalid character {ch:?} in path '{path}'")]
    InvalidCharacter { path: String, ch: char },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(s: &str) -> WorkspacePath {
        WorkspacePath::parse(s).unwrap()
    }

    #[test]
    fn parse_rooted_and_relative_agree() {
        assert_eq!(p("/src/main.rs"), p("src/main.rs"));
        assert_eq!(p("/src/main.rs").to_string(), "/src/main.rs");
    }

    #[test]
    fn parse_collapses_duplicate_slashes_and_dots() {
        assert_eq!(p("//a///b/./c/").to_string(), "/a/b/c");
    }

    #[test]
    fn parse_resolves_parent_segments() {
        assert_eq!(p("/a/b/../c").to_string(), "/a/c");
    }

    #[test]
    fn parse_rejects_escape() {
        let result = WorkspacePath::parse("/../etc/passwd");
        assert!(matches!(result, Err(PathError::EscapesRoot(_))));
    }

    #[test]
    fn parse_rejects_nul() {
        let result = WorkspacePath::parse("/a\0b");
        assert!(matches!(result, Err(PathError::InvalidCharacter { ch: '\0', .. })));
    }

    #[test]
    fn paths_are_case_sensitive() {
        assert_ne!(p("/App.tsx"), p("/app.tsx"));
    }

    #[test]
    fn root_display_and_parent() {
        let root = p("/");
        assert!(root.is_root());
        assert_eq!(root.to_string(), "/");
        assert!(root.parent().is_none());
        assert_eq!(p("/a/b").parent(), Some(p("/a")));
    }

    #[test]
    fn extension_and_file_name() {
        assert_eq!(p("/src/App.tsx").extension(), Some("tsx"));
        assert_eq!(p("/.gitignore").extension(), None);
        assert_eq!(p("/Makefile").extension(), None);
        assert_eq!(p("/src/App.tsx").file_name(), Some("App.tsx"));
    }

    #[test]
    fn ancestry() {
        assert!(p("/a").is_ancestor_of(&p("/a/b")));
        assert!(!p("/a").is_ancestor_of(&p("/a")));
        assert!(!p("/a").is_ancestor_of(&p("/ab")));
        let ancestors: Vec<_> = p("/a/b/c").ancestors().map(|a| a.to_string()).collect();
        assert_eq!(ancestors, vec!["/a", "/a/b"]);
    }

    #[test]
    fn ordering_groups_directories() {
        assert!(p("/a/b") < p("/a-b"));
        assert!(p("/a") < p("/a/b"));
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&p("/src/lib.rs")).unwrap();
        assert_eq!(json, "\"/src/lib.rs\"");
        let back: WorkspacePath = serde_json::from_str("\"src//lib.rs\"").unwrap();
        assert_eq!(back, p("/src/lib.rs"));
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(raw in "[a-z./]{0,24}") {
            if let Ok(path) = WorkspacePath::parse(&raw) {
                let again = WorkspacePath::parse(&path.to_string()).unwrap();
                prop_assert_eq!(&again, &path);
                let shown = path.to_string();
                prop_assert!(!shown.contains("//"));
                prop_assert!(shown == "/" || !shown.ends_with('/'));
            }
        }
    }
}
