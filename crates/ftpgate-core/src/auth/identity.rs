use crate::path::VirtualPath;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// The operations an [`Identity`] may perform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Retrieve files, query their size and modification time.
        const READ = 0b0001;
        /// Store and append files, make directories, rename.
        const WRITE = 0b0010;
        /// Delete files and remove directories.
        const DELETE = 0b0100;
        /// List directories.
        const LIST = 0b1000;
    }
}

/// The kinds of storage a user can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A directory on the local filesystem.
    Filesystem,
    /// An S3-compatible bucket.
    #[serde(alias = "s3")]
    ObjectStore,
    /// A WebDAV collection.
    Webdav,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Filesystem => "filesystem",
            BackendKind::ObjectStore => "objectstore",
            BackendKind::Webdav => "webdav",
        })
    }
}

/// Names the backend configuration a user's files live in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendBinding {
    /// The backend kind
    pub kind: BackendKind,
    /// The name of the backend record
    pub name: String,
    /// An optional namespace the backend record lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl BackendBinding {
    /// Creates a binding without a namespace.
    pub fn new(kind: BackendKind, name: impl Into<String>) -> Self {
        BackendBinding {
            kind,
            name: name.into(),
            namespace: None,
        }
    }

    /// Sets the namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl fmt::Display for BackendBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}:{}", self.kind, self.name),
        }
    }
}

/// The authenticated user of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The login name
    pub username: String,
    /// Where the session starts, relative to the backend root.
    pub home: VirtualPath,
    /// If set, the user cannot see or touch anything outside `home`.
    pub chroot: bool,
    /// What the user may do.
    pub permissions: Permissions,
    /// Which backend holds the user's files.
    pub backend: BackendBinding,
}

impl Identity {
    /// Whether all of `required` are granted.
    pub fn may(&self, required: Permissions) -> bool {
        self.permissions.contains(required)
    }

    /// The lowest directory the user can reach: `home` when chrooted, the backend root otherwise.
    pub fn floor(&self) -> VirtualPath {
        if self.chroot { self.home.clone() } else { VirtualPath::root() }
    }

    /// Whether `path` lies within the user's reach.
    pub fn can_reach(&self, path: &VirtualPath) -> bool {
        !self.chroot || path.starts_with(&self.home)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alice(chroot: bool) -> Identity {
        Identity {
            username: "alice".into(),
            home: VirtualPath::new("/home/alice"),
            chroot,
            permissions: Permissions::READ | Permissions::LIST,
            backend: BackendBinding::new(BackendKind::Filesystem, "local"),
        }
    }

    #[test]
    fn chrooted_identity_is_confined_to_home() {
        let id = alice(true);
        assert_eq!(id.floor(), VirtualPath::new("/home/alice"));
        assert!(id.can_reach(&VirtualPath::new("/home/alice/docs")));
        assert!(!id.can_reach(&VirtualPath::new("/home/bob")));
        assert!(!id.can_reach(&VirtualPath::root()));
    }

    #[test]
    fn unconfined_identity_reaches_everything() {
        let id = alice(false);
        assert_eq!(id.floor(), VirtualPath::root());
        assert!(id.can_reach(&VirtualPath::new("/etc")));
    }

    #[test]
    fn read_only_identity_may_not_write() {
        let id = alice(true);
        assert!(id.may(Permissions::READ));
        assert!(!id.may(Permissions::WRITE));
        assert!(!id.may(Permissions::READ | Permissions::DELETE));
    }

    #[test]
    fn backend_kind_deserializes_lowercase() {
        let kind: BackendKind = serde_json::from_str("\"webdav\"").unwrap();
        assert_eq!(kind, BackendKind::Webdav);
        let kind: BackendKind = serde_json::from_str("\"s3\"").unwrap();
        assert_eq!(kind, BackendKind::ObjectStore);
        assert_eq!(BackendBinding::new(kind, "b").in_namespace("ns").to_string(), "objectstore:ns/b");
    }
}
