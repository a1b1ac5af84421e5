//! Typed results of a path lookup.
//!
//! A [`Node`] is plain data: it holds no connection and captures the
//! [`Version`] it was resolved under by value. Operations that need the
//! network (`children`, `directory_size`, `read_all_*`) live on
//! [`crate::Session`] and always use the node's own version, never the
//! session's current one.

use crate::dav::{DavClient, NodeMetadata};
use crate::path::{self, ROOT};
use crate::{NodeKind, SvnError, Version};

/// A directory resolved at a specific version.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directory {
    path: String,
    parent_path: Option<String>,
    name: String,
    version: Version,
}

/// A file resolved at a specific version.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct File {
    path: String,
    parent_path: Option<String>,
    name: String,
    version: Version,
    size: u64,
    content_type: Option<String>,
    last_modified: Option<String>,
    created_rev: Option<u64>,
    last_author: Option<String>,
}

/// A directory or file resolved at a specific version.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// A directory.
    Directory(Directory),
    /// A file.
    File(File),
}

fn parent_and_name(path: &str) -> (Option<String>, String) {
    (
        path::parent_of(path).map(str::to_string),
        path::file_name(path).to_string(),
    )
}

impl Directory {
    pub(crate) fn new(path: String, version: Version) -> Self {
        let (parent_path, name) = parent_and_name(&path);
        Self {
            path,
            parent_path,
            name,
            version,
        }
    }

    /// Absolute, unescaped path (`/` for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of the containing directory; `None` for the root.
    pub fn parent_path(&self) -> Option<&str> {
        self.parent_path.as_deref()
    }

    /// Last path segment (`""` for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version this directory was resolved under.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Returns `true` for the session root.
    pub fn is_root(&self) -> bool {
        self.path == ROOT
    }
}

impl File {
    fn from_metadata(meta: NodeMetadata, version: Version) -> Self {
        let (parent_path, name) = parent_and_name(&meta.path);
        Self {
            path: meta.path,
            parent_path,
            name,
            version,
            size: meta.size,
            content_type: meta.content_type,
            last_modified: meta.last_modified,
            created_rev: meta.created_rev,
            last_author: meta.last_author,
        }
    }

    /// Absolute, unescaped path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of the containing directory.
    pub fn parent_path(&self) -> Option<&str> {
        self.parent_path.as_deref()
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version this file was resolved under.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Size in bytes, from metadata (no content is fetched).
    pub fn size(&self) -> u64 {
        self.size
    }

    /// `getcontenttype`, if the server reported one.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// `getlastmodified`, if the server reported one.
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    /// Revision in which this file last changed.
    pub fn created_rev(&self) -> Option<u64> {
        self.created_rev
    }

    /// Author of [`File::created_rev`].
    pub fn last_author(&self) -> Option<&str> {
        self.last_author.as_deref()
    }
}

impl Node {
    pub(crate) fn from_metadata(meta: NodeMetadata, version: Version) -> Self {
        match meta.kind {
            NodeKind::Dir => Self::Directory(Directory::new(meta.path, version)),
            NodeKind::File => Self::File(File::from_metadata(meta, version)),
        }
    }

    /// Absolute, unescaped path.
    pub fn path(&self) -> &str {
        match self {
            Self::Directory(d) => d.path(),
            Self::File(f) => f.path(),
        }
    }

    /// Path of the containing directory; `None` for the root.
    pub fn parent_path(&self) -> Option<&str> {
        match self {
            Self::Directory(d) => d.parent_path(),
            Self::File(f) => f.parent_path(),
        }
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        match self {
            Self::Directory(d) => d.name(),
            Self::File(f) => f.name(),
        }
    }

    /// The version this node was resolved under.
    pub fn version(&self) -> &Version {
        match self {
            Self::Directory(d) => d.version(),
            Self::File(f) => f.version(),
        }
    }

    /// File or directory.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Directory(_) => NodeKind::Dir,
            Self::File(_) => NodeKind::File,
        }
    }

    /// Returns `true` for the session root.
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Directory(d) if d.is_root())
    }

    /// Borrows the directory variant.
    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Self::Directory(d) => Some(d),
            Self::File(_) => None,
        }
    }

    /// Borrows the file variant.
    pub fn as_file(&self) -> Option<&File> {
        match self {
            Self::File(f) => Some(f),
            Self::Directory(_) => None,
        }
    }

    /// Converts into the directory variant.
    pub fn into_directory(self) -> Option<Directory> {
        match self {
            Self::Directory(d) => Some(d),
            Self::File(_) => None,
        }
    }

    /// Converts into the file variant.
    pub fn into_file(self) -> Option<File> {
        match self {
            Self::File(f) => Some(f),
            Self::Directory(_) => None,
        }
    }

    /// Two nodes denote the same content only if both path and version match.
    pub fn same_content_as(&self, other: &Node) -> bool {
        self.path() == other.path() && self.version() == other.version()
    }
}

/// Sums the sizes of all files below `path` at `rev`.
///
/// Walks the tree with `Depth: 1` listings using an explicit worklist, so deep
/// trees do not grow the async call stack. Nothing is cached.
pub(crate) async fn tree_size(client: &DavClient, path: &str, rev: u64) -> Result<u64, SvnError> {
    let mut total = 0u64;
    let mut stack = vec![path.to_string()];
    while let Some(dir) = stack.pop() {
        for entry in client.list(&dir, rev).await? {
            match entry.kind {
                NodeKind::File => total = total.saturating_add(entry.size),
                NodeKind::Dir => stack.push(entry.path),
            }
        }
    }
    Ok(total)
}
