//! A [`ControlPlane`] that serves user, backend and secret records from a JSON document.
//!
//! The document has three optional top-level arrays:
//!
//! ```json
//! {
//!   "users": [
//!     {
//!       "username": "alice",
//!       "home": "/home/alice",
//!       "chroot": true,
//!       "permissions": ["read", "list", "write", "delete"],
//!       "credential": { "name": "ftp-users", "key": "alice" },
//!       "backend": { "kind": "filesystem", "name": "local" }
//!     },
//!     {
//!       "username": "anonymous",
//!       "permissions": ["read", "list"],
//!       "backend": { "kind": "filesystem", "name": "local" }
//!     }
//!   ],
//!   "backends": [
//!     { "name": "local", "config": { "kind": "filesystem", "root": "/srv/ftp" } }
//!   ],
//!   "secrets": [
//!     { "name": "ftp-users", "key": "alice", "value": "wonderland" }
//!   ]
//! }
//! ```
//!
//! Files may be gzip compressed. [`JsonFileControlPlane::reload`] re-reads the file; sessions that
//! are already logged in keep what they resolved at login.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use ftpgate_core::{
    auth::BackendKind,
    controlplane::{BackendConfig, ControlPlane, LookupError, LookupErrorKind, SecretRef, UserRecord},
};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    io::Read,
    path::{Path, PathBuf},
};
use tokio::sync::RwLock;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    backends: Vec<BackendEntry>,
    #[serde(default)]
    secrets: Vec<SecretEntry>,
}

#[derive(Deserialize, Debug)]
struct BackendEntry {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    config: BackendConfig,
}

#[derive(Deserialize, Debug)]
struct SecretEntry {
    name: String,
    key: String,
    #[serde(default)]
    namespace: Option<String>,
    value: String,
}

#[derive(Debug, Default)]
struct Records {
    users: HashMap<String, UserRecord>,
    backends: HashMap<(BackendKind, String, Option<String>), BackendConfig>,
    secrets: HashMap<(String, String, Option<String>), Vec<u8>>,
}

impl From<Document> for Records {
    fn from(doc: Document) -> Self {
        Records {
            users: doc.users.into_iter().map(|u| (u.username.clone(), u)).collect(),
            backends: doc.backends.into_iter().map(|b| ((b.config.kind(), b.name, b.namespace), b.config)).collect(),
            secrets: doc
                .secrets
                .into_iter()
                .map(|s| ((s.name, s.key, s.namespace), s.value.into_bytes()))
                .collect(),
        }
    }
}

/// [`ControlPlane`] implementation backed by a JSON document.
#[derive(Debug)]
pub struct JsonFileControlPlane {
    path: Option<PathBuf>,
    records: RwLock<Records>,
}

impl JsonFileControlPlane {
    /// Loads the records from a file, which may be gzip compressed.
    pub fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self, LookupError> {
        let records = read_file(filename.as_ref())?;
        Ok(JsonFileControlPlane {
            path: Some(filename.as_ref().to_path_buf()),
            records: RwLock::new(records),
        })
    }

    /// Loads the records from a JSON string.
    pub fn from_json<T: AsRef<str>>(json: T) -> Result<Self, LookupError> {
        Ok(JsonFileControlPlane {
            path: None,
            records: RwLock::new(parse(json.as_ref().as_bytes())?),
        })
    }

    /// Re-reads the file this control plane was loaded from. On error the previous records stay in
    /// place. A control plane created with [`from_json`](Self::from_json) has nothing to reload.
    pub async fn reload(&self) -> Result<(), LookupError> {
        if let Some(path) = &self.path {
            let path = path.clone();
            let records = tokio::task::spawn_blocking(move || read_file(&path))
                .await
                .map_err(|e| LookupError::new(LookupErrorKind::Unavailable, e))??;
            *self.records.write().await = records;
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Records, LookupError> {
    let raw = fs::read(path).map_err(|e| LookupError::new(LookupErrorKind::Unavailable, e))?;
    if raw.starts_with(&GZIP_MAGIC) {
        let mut json = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut json)
            .map_err(|e| LookupError::new(LookupErrorKind::Malformed, e))?;
        parse(&json)
    } else {
        parse(&raw)
    }
}

fn parse(json: &[u8]) -> Result<Records, LookupError> {
    let doc: Document = serde_json::from_slice(json).map_err(|e| LookupError::new(LookupErrorKind::Malformed, e))?;
    Ok(doc.into())
}

#[async_trait]
impl ControlPlane for JsonFileControlPlane {
    #[tracing_attributes::instrument(skip(self))]
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, LookupError> {
        Ok(self.records.read().await.users.get(username).cloned())
    }

    #[tracing_attributes::instrument(skip(self))]
    async fn lookup_backend(&self, kind: BackendKind, name: &str, namespace: Option<&str>) -> Result<Option<BackendConfig>, LookupError> {
        let key = (kind, name.to_string(), namespace.map(str::to_string));
        Ok(self.records.read().await.backends.get(&key).cloned())
    }

    #[tracing_attributes::instrument(skip(self))]
    async fn lookup_secret(&self, reference: &SecretRef) -> Result<Option<Vec<u8>>, LookupError> {
        let key = (reference.name.clone(), reference.key.clone(), reference.namespace.clone());
        Ok(self.records.read().await.secrets.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftpgate_core::{auth::Permissions, controlplane::SecretValue};
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"{
        "users": [
            {"username": "alice", "home": "/home/alice", "chroot": true,
             "permissions": ["read", "list", "write", "delete"],
             "credential": {"name": "ftp-users", "key": "alice"},
             "backend": {"kind": "filesystem", "name": "local"}},
            {"username": "anonymous", "permissions": ["read", "list"],
             "backend": {"kind": "s3", "name": "public", "namespace": "media"}}
        ],
        "backends": [
            {"name": "local", "config": {"kind": "filesystem", "root": "/srv/ftp"}},
            {"name": "public", "namespace": "media",
             "config": {"kind": "s3", "endpoint": "http://127.0.0.1:9000", "bucket": "pub",
                        "access_key_id": "id", "secret_access_key": {"name": "s3", "key": "secret"}}}
        ],
        "secrets": [
            {"name": "ftp-users", "key": "alice", "value": "wonderland"}
        ]
    }"#;

    #[tokio::test]
    async fn resolves_users() {
        let cp = JsonFileControlPlane::from_json(DOC).unwrap();
        let alice = cp.lookup_user("alice").await.unwrap().unwrap();
        assert!(alice.chroot);
        assert_eq!(alice.permission_set(), Permissions::all());
        assert!(matches!(alice.credential, Some(SecretValue::Ref(_))));

        let anon = cp.lookup_user("anonymous").await.unwrap().unwrap();
        assert_eq!(anon.credential, None);
        assert_eq!(anon.permission_set(), Permissions::READ | Permissions::LIST);

        assert!(cp.lookup_user("mallory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolves_backends_by_kind_name_and_namespace() {
        let cp = JsonFileControlPlane::from_json(DOC).unwrap();
        assert!(cp.lookup_backend(BackendKind::Filesystem, "local", None).await.unwrap().is_some());
        assert!(cp.lookup_backend(BackendKind::ObjectStore, "public", Some("media")).await.unwrap().is_some());
        assert!(cp.lookup_backend(BackendKind::ObjectStore, "public", None).await.unwrap().is_none());
        assert!(cp.lookup_backend(BackendKind::Webdav, "local", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolves_secrets() {
        let cp = JsonFileControlPlane::from_json(DOC).unwrap();
        let r = SecretRef {
            name: "ftp-users".into(),
            key: "alice".into(),
            namespace: None,
        };
        assert_eq!(cp.lookup_secret(&r).await.unwrap(), Some(b"wonderland".to_vec()));
    }

    #[test]
    fn rejects_malformed_documents() {
        let err = JsonFileControlPlane::from_json(r#"{"users": 42}"#).unwrap_err();
        assert_eq!(err.kind(), LookupErrorKind::Malformed);
        let err = JsonFileControlPlane::from_json(r#"{"groups": []}"#).unwrap_err();
        assert_eq!(err.kind(), LookupErrorKind::Malformed);
    }
}
