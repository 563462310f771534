//! Contains the [`ControlPlane`] read interface through which the server learns about users,
//! backends and secrets.
//!
//! The records behind it are maintained elsewhere (a reconciliation loop, a JSON file, a database)
//! and may change between calls. The server only ever reads.

mod memory;
mod records;

pub use memory::InMemoryControlPlane;
pub use records::{BackendConfig, Permission, SecretRef, SecretValue, UserRecord};

use crate::{BoxError, auth::BackendKind};
use async_trait::async_trait;
use derive_more::Display;
use std::fmt::Debug;
use thiserror::Error;

/// The three lookups the server performs against the surrounding configuration layer.
///
/// A lookup that finds nothing returns `Ok(None)`; `Err` is reserved for the control plane itself
/// failing.
#[async_trait]
pub trait ControlPlane: Send + Sync + Debug {
    /// Resolves a user by login name.
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, LookupError>;

    /// Resolves a backend configuration by kind, name and optional namespace.
    async fn lookup_backend(&self, kind: BackendKind, name: &str, namespace: Option<&str>) -> Result<Option<BackendConfig>, LookupError>;

    /// Resolves secret material.
    async fn lookup_secret(&self, reference: &SecretRef) -> Result<Option<Vec<u8>>, LookupError>;
}

/// Error returned by [`ControlPlane`] lookups.
#[derive(Debug, Error)]
#[error("control plane lookup failed: {kind}")]
pub struct LookupError {
    kind: LookupErrorKind,
    #[source]
    source: Option<BoxError>,
}

impl LookupError {
    /// Creates a new lookup error
    pub fn new<E>(kind: LookupErrorKind, error: E) -> LookupError
    where
        E: Into<BoxError>,
    {
        LookupError {
            kind,
            source: Some(error.into()),
        }
    }

    /// What went wrong
    pub fn kind(&self) -> LookupErrorKind {
        self.kind
    }
}

impl From<LookupErrorKind> for LookupError {
    fn from(kind: LookupErrorKind) -> Self {
        LookupError { kind, source: None }
    }
}

/// The ways a control plane lookup can fail.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum LookupErrorKind {
    /// The control plane could not be reached.
    #[display("control plane unavailable")]
    Unavailable,
    /// A record was found but could not be understood.
    #[display("malformed record")]
    Malformed,
}
