//! Virtual file records

use crate::hash::ContentHash;
use crate::path::WorkspacePath;
use serde::{Deserialize, Serialize};

/// A file in the virtual workspace
///
/// `sequence` is the execution-log index of the command that last wrote the
/// file; it is assigned by the caller, the file system never invents one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFile {
    path: WorkspacePath,
    content: String,
    sequence: u64,
    hash: ContentHash,
}

impl VirtualFile {
    /// Create file record, hashing its content
    #[must_use]
    pub fn new(path: WorkspacePath, content: String, sequence: u64) -> Self {
        let hash = ContentHash::compute(content.as_bytes());
        Self {
            path,
            content,
            sequence,
            hash,
        }
    }

    /// Normalized path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &WorkspacePath {
        &self.path
    }

    /// Full text content
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Log index of the last write
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Blake3 hash of the content
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Content size in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the file has no content
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Number of lines (a trailing newline does not start a new line)
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    pub(crate) fn replace_content(&mut self, content: String, sequence: u64) {
        self.hash = ContentHash::compute(content.as_bytes());
        self.content = content;
        self.sequence = sequence;
    }
}
