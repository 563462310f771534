//! Contains the user/permission [`Resolver`] that turns a login into an [`Identity`].
//!
//! Users are not configured on the server itself. They are records in a
//! [`ControlPlane`](crate::controlplane::ControlPlane), looked up by name on every login, so edits
//! to a record apply from the next login on. The resolved [`Identity`] then stays fixed for the
//! rest of the session.
//!
//! There is no special casing for anonymous or administrative users: a record with the `read` and
//! `list` permissions and no credential is an anonymous user, one with all four permissions an
//! administrator.

mod resolver;
pub use resolver::Resolver;

pub use ftpgate_core::auth::{AuthenticationError, BackendBinding, BackendKind, Identity, Permissions};
