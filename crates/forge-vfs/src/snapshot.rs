//! Ordered, content-addressed tree snapshots
//!
//! A [`Snapshot`] is the read-only view of a workspace handed to callers at
//! finalization. Its Merkle root (via `rs_merkle`) summarizes the whole tree,
//! so two builds can be compared with one hash.

use crate::file::VirtualFile;
use crate::hash::ContentHash;
use crate::path::WorkspacePath;
use rs_merkle::{Hasher, MerkleTree};
use serde::{Deserialize, Serialize};

/// Frozen copy of a virtual file system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    files: Vec<VirtualFile>,
    root: ContentHash,
}

impl Snapshot {
    /// Build from files already ordered by path
    pub(crate) fn from_files(files: Vec<VirtualFile>) -> Self {
        debug_assert!(files.windows(2).all(|w| w[0].path() < w[1].path()));
        let leaves: Vec<[u8; 32]> = files
            .iter()
            .map(|f| *ContentHash::leaf(f.path(), f.hash()).as_bytes())
            .collect();
        let root = MerkleTree::<Blake3Hasher>::from_leaves(&leaves)
            .root()
            .map_or_else(ContentHash::default, ContentHash::new);
        Self { files, root }
    }

    /// Merkle root over `(path, content hash)` leaves; zero for an empty tree
    #[inline]
    #[must_use]
    pub fn root(&self) -> &ContentHash {
        &self.root
    }

    /// Files ordered by path
    #[inline]
    #[must_use]
    pub fn files(&self) -> &[VirtualFile] {
        &self.files
    }

    /// Look up a file by path
    #[must_use]
    pub fn get(&self, path: &WorkspacePath) -> Option<&VirtualFile> {
        self.files
            .binary_search_by(|f| f.path().cmp(path))
            .ok()
            .map(|idx| &self.files[idx])
    }

    /// Ordered paths
    pub fn paths(&self) -> impl Iterator<Item = &WorkspacePath> {
        self.files.iter().map(VirtualFile::path)
    }

    /// Number of files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the snapshot holds no files
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Compare content only, ignoring which log entry last wrote each file
    #[inline]
    #[must_use]
    pub fn same_tree(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

/// Blake3 hasher adapter for `rs_merkle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    type Hash = [u8; 32];

    #[inline]
    fn hash(data: &[u8]) -> Self::Hash {
        *blake3::hash(data).as_bytes()
    }
}
