//! Forge virtual file system
//!
//! The in-memory project tree that streamed build commands mutate.
//!
//! # Core Concepts
//!
//! - [`WorkspacePath`]: Normalized, rooted, case-sensitive POSIX path
//! - [`VirtualFile`]: Path + content + sequence number of the last write
//! - [`VirtualFileSystem`]: Path → file map with create/write/remove conflict rules
//! - [`Snapshot`]: Ordered, frozen copy of the tree with a Merkle root
//!
//! # Example
//!
//! ```rust
//! use forge_vfs::{VirtualFileSystem, WorkspacePath};
//!
//! let mut fs = VirtualFileSystem::new();
//! let path = WorkspacePath::parse("src//main.rs").unwrap();
//! fs.create(&path, "fn main() {}", 0).unwrap();
//!
//! assert_eq!(fs.read(&path).unwrap().content(), "fn main() {}");
//! assert!(fs.create(&path, "again", 1).is_err());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod file;
mod fs;
mod hash;
mod path;
mod snapshot;

pub use file::VirtualFile;
pub use fs::{DirEntry, TreeIter, VfsError, VirtualFileSystem};
pub use hash::{ContentHash, HashError};
pub use path::{PathError, WorkspacePath};
pub use snapshot::{Blake3Hasher, Snapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn create_edit_delete_leaves_empty_tree() {
        let mut fs = VirtualFileSystem::new();
        let path = WorkspacePath::parse("/a.txt").unwrap();

        fs.create(&path, "hi", 0).unwrap();
        fs.write(&path, "bye", 1).unwrap();
        let removed = fs.remove(&path).unwrap();

        assert_eq!(removed.content(), "bye");
        assert_eq!(removed.sequence(), 1);
        assert!(fs.is_empty());
        assert!(fs.snapshot().root().is_zero());
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let mut fs = VirtualFileSystem::new();
        let path = WorkspacePath::parse("/a.txt").unwrap();
        fs.create(&path, "v1", 0).unwrap();

        let before = fs.snapshot();
        fs.write(&path, "v2", 1).unwrap();

        assert_eq!(before.get(&path).unwrap().content(), "v1");
        assert!(!before.same_tree(&fs.snapshot()));
    }
}
