//! Contains the [`Identity`] a successful login produces and the pieces it is made of.
//!
//! An `Identity` is resolved once per login from a control plane user record and stays immutable
//! for the rest of the session. Anonymous and administrative users are not special cased anywhere:
//! they are identities whose [`Permissions`] happen to be `READ | LIST` or `all()`.

mod identity;
pub use identity::{BackendBinding, BackendKind, Identity, Permissions};

use thiserror::Error;

/// The error returned when a username and credential could not be turned into an [`Identity`].
///
/// Deliberately carries no detail: an unknown user, a disabled user, a wrong password and a secret
/// that could not be fetched all look the same to the client.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("authentication failed")]
pub struct AuthenticationError;
