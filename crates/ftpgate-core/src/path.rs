//! Contains [`VirtualPath`], the only path representation handed to storage back-ends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An absolute, slash separated path relative to a storage back-end's root.
///
/// A `VirtualPath` is always normalized: it starts with `/`, has no empty, `.` or `..` segments and
/// no trailing slash (except for the root itself). Construction clamps `..` at the root so a value
/// of this type can never name something above the back-end's root.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VirtualPath(String);

impl VirtualPath {
    /// The root of the back-end.
    pub fn root() -> Self {
        VirtualPath(String::from("/"))
    }

    /// Normalizes `path` relative to the root.
    pub fn new(path: &str) -> Self {
        Self::root().resolve(path, &Self::root())
    }

    /// Resolves the client supplied `input` against `self` (typically the current working
    /// directory).
    ///
    /// Absolute input is normalized from the root and `..` clamps at the root. Relative input is
    /// applied to `self` and `..` clamps at `floor`, which must be an ancestor of (or equal to)
    /// `self`. The caller still has to check absolute results against any confinement it enforces.
    pub fn resolve(&self, input: &str, floor: &VirtualPath) -> VirtualPath {
        let (mut segments, min_len) = if input.starts_with('/') {
            (Vec::new(), 0)
        } else {
            let floor_len = if self.starts_with(floor) { floor.segments().count() } else { 0 };
            (self.segments().collect::<Vec<_>>(), floor_len)
        };
        for segment in input.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.len() > min_len {
                        segments.pop();
                    }
                }
                s => segments.push(s),
            }
        }
        Self::from_segments(segments)
    }

    /// Appends a single entry name.
    pub fn join(&self, name: &str) -> VirtualPath {
        self.resolve(name, &Self::root())
    }

    /// The containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<VirtualPath> {
        if self.is_root() {
            return None;
        }
        let mut segments: Vec<&str> = self.segments().collect();
        segments.pop();
        Some(Self::from_segments(segments))
    }

    /// The last segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().next_back()
    }

    /// Whether this is `/`.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Component-wise prefix test: `/home/al` is not a prefix of `/home/alice`.
    pub fn starts_with(&self, base: &VirtualPath) -> bool {
        base.is_root() || self.0 == base.0 || (self.0.starts_with(&base.0) && self.0.as_bytes().get(base.0.len()) == Some(&b'/'))
    }

    /// The path without its leading slash. Empty for the root.
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }

    /// The normalized path including the leading slash.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the path segments.
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    fn from_segments(segments: Vec<&str>) -> VirtualPath {
        VirtualPath(format!("/{}", segments.join("/")))
    }
}

impl Default for VirtualPath {
    fn default() -> Self {
        Self::root()
    }
}

impl From<String> for VirtualPath {
    fn from(s: String) -> Self {
        VirtualPath::new(&s)
    }
}

impl From<&str> for VirtualPath {
    fn from(s: &str) -> Self {
        VirtualPath::new(s)
    }
}

impl From<VirtualPath> for String {
    fn from(p: VirtualPath) -> Self {
        p.0
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
