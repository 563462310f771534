use crate::{
    auth::{BackendBinding, BackendKind, Permissions},
    path::VirtualPath,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user as declared in the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// The login name
    pub username: String,
    /// Disabled users cannot log in.
    #[serde(default)]
    pub disabled: bool,
    /// The home directory, relative to the backend root.
    #[serde(default)]
    pub home: VirtualPath,
    /// Confine the user to `home`.
    #[serde(default)]
    pub chroot: bool,
    /// What the user may do.
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// The password. `None` means no password is required (anonymous access).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<SecretValue>,
    /// Where the user's files live.
    pub backend: BackendBinding,
}

impl UserRecord {
    /// Folds the permission list into a set.
    pub fn permission_set(&self) -> Permissions {
        self.permissions.iter().fold(Permissions::empty(), |acc, p| acc | Permissions::from(*p))
    }
}

/// A single permission as spelled in a [`UserRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// See [`Permissions::READ`]
    Read,
    /// See [`Permissions::WRITE`]
    Write,
    /// See [`Permissions::DELETE`]
    Delete,
    /// See [`Permissions::LIST`]
    List,
}

impl From<Permission> for Permissions {
    fn from(p: Permission) -> Self {
        match p {
            Permission::Read => Permissions::READ,
            Permission::Write => Permissions::WRITE,
            Permission::Delete => Permissions::DELETE,
            Permission::List => Permissions::LIST,
        }
    }
}

/// Secret material, either inline or held in the control plane's secret store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretValue {
    /// The material itself.
    Inline(String),
    /// A pointer to it.
    Ref(SecretRef),
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Inline(_) => f.write_str("Inline(*******)"),
            SecretValue::Ref(r) => f.debug_tuple("Ref").field(r).finish(),
        }
    }
}

/// Points at one key of a named secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretRef {
    /// The secret's name
    pub name: String,
    /// The key within the secret
    pub key: String,
    /// The namespace the secret lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// The connection parameters of a backend, as declared in the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// A local directory.
    Filesystem {
        /// The directory the backend root maps onto.
        root: String,
    },
    /// An S3-compatible bucket.
    #[serde(alias = "s3")]
    ObjectStore {
        /// The service endpoint, e.g. `https://s3.eu-west-1.amazonaws.com`.
        endpoint: String,
        /// The region. Defaults to `us-east-1`.
        #[serde(default)]
        region: Option<String>,
        /// The bucket name
        bucket: String,
        /// A prefix within the bucket the backend root maps onto.
        #[serde(default)]
        root: Option<String>,
        /// The access key id
        access_key_id: String,
        /// The secret access key
        secret_access_key: SecretValue,
    },
    /// A WebDAV server.
    Webdav {
        /// The server URL
        endpoint: String,
        /// The login name
        #[serde(default)]
        username: Option<String>,
        /// The password
        #[serde(default)]
        password: Option<SecretValue>,
        /// A collection on the server the backend root maps onto.
        #[serde(default)]
        root: Option<String>,
    },
}

impl BackendConfig {
    /// The kind of backend this configures.
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Filesystem { .. } => BackendKind::Filesystem,
            BackendConfig::ObjectStore { .. } => BackendKind::ObjectStore,
            BackendConfig::Webdav { .. } => BackendKind::Webdav,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn user_record_from_json() {
        let json = r#"{
            "username": "alice",
            "home": "/home/alice",
            "chroot": true,
            "permissions": ["read", "list", "write"],
            "credential": {"name": "alice-pw", "key": "password"},
            "backend": {"kind": "filesystem", "name": "local"}
        }"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.home, VirtualPath::new("/home/alice"));
        assert_eq!(user.permission_set(), Permissions::READ | Permissions::LIST | Permissions::WRITE);
        assert!(matches!(user.credential, Some(SecretValue::Ref(ref r)) if r.name == "alice-pw"));
        assert!(!user.disabled);
    }

    #[test]
    fn backend_config_is_tagged_by_kind() {
        let json = r#"{"kind": "s3", "endpoint": "http://127.0.0.1:9000", "bucket": "b",
                       "access_key_id": "id", "secret_access_key": "inline-secret"}"#;
        let cfg: BackendConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.kind(), BackendKind::ObjectStore);
    }

    #[test]
    fn inline_secret_is_masked_in_debug() {
        let s = SecretValue::Inline("hunter2".into());
        assert!(!format!("{s:?}").contains("hunter2"));
    }
}
