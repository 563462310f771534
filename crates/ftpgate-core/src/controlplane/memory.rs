use super::{BackendConfig, ControlPlane, LookupError, SecretRef, UserRecord};
use crate::auth::BackendKind;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

type BackendKey = (BackendKind, String, Option<String>);
type SecretKey = (String, String, Option<String>);

/// A [`ControlPlane`] that keeps its records in memory.
///
/// Records can be changed while the server runs, which is how embedders wire in their own
/// reconciliation logic and how tests simulate a backend being edited mid-session.
#[derive(Debug, Default)]
pub struct InMemoryControlPlane {
    users: RwLock<HashMap<String, UserRecord>>,
    backends: RwLock<HashMap<BackendKey, BackendConfig>>,
    secrets: RwLock<HashMap<SecretKey, Vec<u8>>>,
}

impl InMemoryControlPlane {
    /// Creates an empty control plane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn upsert_user(&self, user: UserRecord) {
        self.users.write().await.insert(user.username.clone(), user);
    }

    /// Removes a user.
    pub async fn remove_user(&self, username: &str) {
        self.users.write().await.remove(username);
    }

    /// Adds or replaces a backend under `name` and `namespace`.
    pub async fn upsert_backend(&self, name: &str, namespace: Option<&str>, config: BackendConfig) {
        let key = (config.kind(), name.to_string(), namespace.map(str::to_string));
        self.backends.write().await.insert(key, config);
    }

    /// Removes a backend.
    pub async fn remove_backend(&self, kind: BackendKind, name: &str, namespace: Option<&str>) {
        self.backends.write().await.remove(&(kind, name.to_string(), namespace.map(str::to_string)));
    }

    /// Adds or replaces a secret value.
    pub async fn upsert_secret(&self, reference: &SecretRef, value: impl Into<Vec<u8>>) {
        self.secrets.write().await.insert(secret_key(reference), value.into());
    }
}

fn secret_key(r: &SecretRef) -> SecretKey {
    (r.name.clone(), r.key.clone(), r.namespace.clone())
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, LookupError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn lookup_backend(&self, kind: BackendKind, name: &str, namespace: Option<&str>) -> Result<Option<BackendConfig>, LookupError> {
        let key = (kind, name.to_string(), namespace.map(str::to_string));
        Ok(self.backends.read().await.get(&key).cloned())
    }

    async fn lookup_secret(&self, reference: &SecretRef) -> Result<Option<Vec<u8>>, LookupError> {
        Ok(self.secrets.read().await.get(&secret_key(reference)).cloned())
    }
}
