//! The in-memory virtual file system
//!
//! [`VirtualFileSystem`] is a pure map from [`WorkspacePath`] to
//! [`VirtualFile`]. Directories are implicit: a directory exists while at least
//! one file lives beneath it.

use crate::file::VirtualFile;
use crate::path::WorkspacePath;
use crate::snapshot::Snapshot;
use std::collections::btree_map::{self, BTreeMap};
use std::ops::Bound;

/// In-memory workspace tree
///
/// # Invariants
/// - Keys are normalized paths; no key is the root
/// - No file path is an ancestor of another file path
#[derive(Debug, Clone, Default)]
pub struct VirtualFileSystem {
    files: BTreeMap<WorkspacePath, VirtualFile>,
    allow_overwrite: bool,
}

impl VirtualFileSystem {
    /// Create empty file system with overwrite disabled
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty file system with explicit overwrite policy
    #[inline]
    #[must_use]
    pub fn with_overwrite(allow_overwrite: bool) -> Self {
        Self {
            files: BTreeMap::new(),
            allow_overwrite,
        }
    }

    /// Whether `create` may replace an existing file
    #[inline]
    #[must_use]
    pub fn allows_overwrite(&self) -> bool {
        self.allow_overwrite
    }

    /// Create a new file
    ///
    /// # Errors
    /// - [`VfsError::PathExists`] if the file exists and overwrite is disabled
    /// - [`VfsError::ParentIsFile`] if an ancestor path is a file
    /// - [`VfsError::IsDirectory`] if the path is the root or has files beneath it
    pub fn create(
        &mut self,
        path: &WorkspacePath,
        content: impl Into<String>,
        sequence: u64,
    ) -> Result<&VirtualFile, VfsError> {
        if path.is_root() || self.has_descendants(path) {
            return Err(VfsError::IsDirectory(path.clone()));
        }
        if let Some(parent) = path.ancestors().find(|a| self.files.contains_key(a)) {
            return Err(VfsError::ParentIsFile {
                path: path.clone(),
                parent,
            });
        }

        let content = content.into();
        let allow_overwrite = self.allow_overwrite;
        match self.files.entry(path.clone()) {
            btree_map::Entry::Occupied(entry) if !allow_overwrite => {
                Err(VfsError::PathExists(entry.key().clone()))
            }
            btree_map::Entry::Occupied(entry) => {
                tracing::debug!(path = %path, "overwriting existing file on create");
                let file = entry.into_mut();
                file.replace_content(content, sequence);
                Ok(file)
            }
            btree_map::Entry::Vacant(entry) => {
                Ok(entry.insert(VirtualFile::new(path.clone(), content, sequence)))
            }
        }
    }

    /// Replace the content of an existing file
    ///
    /// # Errors
    /// [`VfsError::NotFound`] if the file does not exist
    pub fn write(
        &mut self,
        path: &WorkspacePath,
        content: impl Into<String>,
        sequence: u64,
    ) -> Result<&VirtualFile, VfsError> {
        let file = self.existing_mut(path)?;
        file.replace_content(content.into(), sequence);
        Ok(file)
    }

    /// Append to an existing file
    ///
    /// A newline is inserted first when the current content is non-empty and
    /// does not already end with one.
    ///
    /// # Errors
    /// [`VfsError::NotFound`] if the file does not exist
    pub fn append(
        &mut self,
        path: &WorkspacePath,
        content: &str,
        sequence: u64,
    ) -> Result<&VirtualFile, VfsError> {
        let file = self.existing_mut(path)?;
        let mut next = String::with_capacity(file.len() + content.len() + 1);
        next.push_str(file.content());
        if !next.is_empty() && !next.ends_with('\n') {
            next.push('\n');
        }
        next.push_str(content);
        file.replace_content(next, sequence);
        Ok(file)
    }

    /// Replace lines `start..=end` (1-based) of an existing file
    ///
    /// Lines outside the range are kept byte for byte. Inserted lines use the
    /// file's own line ending, and the last one inherits the terminator of the
    /// last replaced line. An empty replacement deletes the lines.
    ///
    /// # Errors
    /// - [`VfsError::NotFound`] if the file does not exist
    /// - [`VfsError::LineRangeOutOfBounds`] if the range is empty or past the end
    pub fn replace_lines(
        &mut self,
        path: &WorkspacePath,
        start: usize,
        end: usize,
        replacement: &str,
        sequence: u64,
    ) -> Result<&VirtualFile, VfsError> {
        let file = self.existing_mut(path)?;
        let lines: Vec<&str> = file.content().split_inclusive('\n').collect();
        if start == 0 || start > end || end > lines.len() {
            return Err(VfsError::LineRangeOutOfBounds {
                path: path.clone(),
                start,
                end,
                lines: lines.len(),
            });
        }

        let eol = if file.content().contains("\r\n") { "\r\n" } else { "\n" };
        let tail_eol = line_ending(lines[end - 1]);

        let mut next = String::with_capacity(file.len() + replacement.len());
        lines[..start - 1].iter().for_each(|line| next.push_str(line));
        let mut inserted = replacement.lines().peekable();
        if inserted.peek().is_none() && tail_eol.is_empty() {
            // the unterminated last line is gone; the new last line loses its ending
            let kept = next.len() - line_ending(&next).len();
            next.truncate(kept);
        }
        while let Some(line) = inserted.next() {
            next.push_str(line);
            next.push_str(if inserted.peek().is_some() { eol } else { tail_eol });
        }
        lines[end..].iter().for_each(|line| next.push_str(line));

        file.replace_content(next, sequence);
        Ok(file)
    }

    /// Remove a file, returning its last state
    ///
    /// # Errors
    /// [`VfsError::NotFound`] if the file does not exist
    pub fn remove(&mut self, path: &WorkspacePath) -> Result<VirtualFile, VfsError> {
        self.files
            .remove(path)
            .ok_or_else(|| VfsError::NotFound(path.clone()))
    }

    /// Look up a file
    #[inline]
    #[must_use]
    pub fn read(&self, path: &WorkspacePath) -> Option<&VirtualFile> {
        self.files.get(path)
    }

    /// Check if a file exists at path
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &WorkspacePath) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the tree holds no files
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Lazy traversal of every file ordered by path
    ///
    /// The iterator is `Clone`; cloning it (or calling `list_tree` again)
    /// restarts the walk from the current position or the beginning.
    #[inline]
    #[must_use]
    pub fn list_tree(&self) -> TreeIter<'_> {
        TreeIter {
            inner: self.files.values(),
        }
    }

    /// Immediate children of a directory, ordered by name
    #[must_use]
    pub fn list_dir(&self, dir: &WorkspacePath) -> Vec<DirEntry> {
        let depth = dir.depth();
        let mut entries: Vec<DirEntry> = Vec::new();
        for path in self.descendants(dir).map(VirtualFile::path) {
            let name = &path.segments()[depth];
            let entry = if path.depth() == depth + 1 {
                DirEntry::File(name.clone())
            } else {
                DirEntry::Directory(name.clone())
            };
            if entries.last() != Some(&entry) {
                entries.push(entry);
            }
        }
        entries
    }

    /// Immutable, ordered copy of the tree
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_files(self.files.values().cloned().collect())
    }

    fn existing_mut(&mut self, path: &WorkspacePath) -> Result<&mut VirtualFile, VfsError> {
        self.files
            .get_mut(path)
            .ok_or_else(|| VfsError::NotFound(path.clone()))
    }

    fn descendants<'a>(&'a self, dir: &'a WorkspacePath) -> impl Iterator<Item = &'a VirtualFile> + 'a {
        self.files
            .range((Bound::Excluded(dir.clone()), Bound::Unbounded))
            .map(|(_, file)| file)
            .take_while(move |file| dir.is_ancestor_of(file.path()))
    }

    fn has_descendants(&self, path: &WorkspacePath) -> bool {
        self.descendants(path).next().is_some()
    }
}

/// Terminator of a line from `split_inclusive('\n')`: `"\r\n"`, `"\n"` or `""`
fn line_ending(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

/// Ordered, restartable file traversal
#[derive(Debug, Clone)]
pub struct TreeIter<'a> {
    inner: btree_map::Values<'a, WorkspacePath, VirtualFile>,
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = &'a VirtualFile;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for TreeIter<'_> {}

/// Entry returned by [`VirtualFileSystem::list_dir`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirEntry {
    /// A file directly inside the directory
    File(String),
    /// A subdirectory (contains at least one file)
    Directory(String),
}

/// Conflicts raised by file system mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum VfsError {
    /// Create on an existing file with overwrite disabled
    #[error("path already exists: {0}")]
    PathExists(WorkspacePath),

    /// Edit/delete of a missing file
    #[error("path not found: {0}")]
    NotFound(WorkspacePath),

    /// An ancestor of the path is a file
    #[error("cannot create {path}: {parent} is a file")]
    ParentIsFile {
        path: WorkspacePath,
        parent: WorkspacePath,
    },

    /// The path is a directory (root, or has files beneath it)
    #[error("path is a directory: {0}")]
    IsDirectory(WorkspacePath),

    /// Line range does not fit the file
    #[error("lines {start}-{end} out of bounds for {path} ({lines} lines)")]
    LineRangeOutOfBounds {
        path: WorkspacePath,
        start: usize,
        end: usize,
        lines: usize,
    },
}
