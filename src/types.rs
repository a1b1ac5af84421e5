//! Public data types returned by this crate.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// An immutable repository revision.
///
/// Versions are ordered and compared by [`Version::ordinal`] only; the
/// metadata fields are informational. `name` is the decimal rendering of the
/// ordinal, so consecutive revisions differ by exactly one.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct Version {
    name: String,
    ordinal: u64,
    date: Option<String>,
    author: Option<String>,
    message: Option<String>,
}

impl Version {
    /// Creates a version for revision `rev` without log metadata.
    pub fn new(rev: u64) -> Self {
        Self {
            name: rev.to_string(),
            ordinal: rev,
            date: None,
            author: None,
            message: None,
        }
    }

    pub(crate) fn with_log(
        rev: u64,
        date: Option<String>,
        author: Option<String>,
        message: Option<String>,
    ) -> Self {
        Self {
            date,
            author,
            message,
            ..Self::new(rev)
        }
    }

    /// Revision name as reported by the server (`"192"`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parses [`Version::name`] back into a revision number.
    pub fn name_as_u64(&self) -> Option<u64> {
        self.name.parse().ok()
    }

    /// Revision number.
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    /// Commit date (`svn:date`), if known.
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    /// Commit author (`svn:author`), if known.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Commit message (`svn:log`), if known.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal.cmp(&other.ordinal)
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ordinal.hash(state);
    }
}

impl From<u64> for Version {
    fn from(rev: u64) -> Self {
        Self::new(rev)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.ordinal)
    }
}

/// The kind of a node in the repository.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// A file node.
    File,
    /// A directory node.
    Dir,
}

impl NodeKind {
    /// Returns a stable string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Dir => "dir",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Information collected from the server during session start.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ServerInfo {
    /// Head revision at handshake time (`SVN-Youngest-Rev`), if announced.
    pub youngest_rev: Option<u64>,
    /// URL path of the repository root (`SVN-Repository-Root`), if announced.
    pub repository_root: Option<String>,
    /// Repository UUID (`SVN-Repository-UUID`), if announced.
    pub repository_uuid: Option<String>,
    /// Compliance classes from the `DAV` response header.
    pub dav_compliance: Vec<String>,
}

impl ServerInfo {
    /// Returns `true` if the server advertised the given `DAV` compliance class.
    pub fn has_compliance(&self, class: &str) -> bool {
        self.dav_compliance.iter().any(|c| c == class)
    }
}
