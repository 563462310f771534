//! Storage back-ends as the server sees them.
//!
//! The [`StorageBackend`] trait and its error taxonomy live in `ftpgate-core` so that adapters can
//! be written without depending on the server. This module re-exports them and adds the
//! [`BackendRegistry`] that turns the backend binding of a logged in user into an adapter.

mod registry;
pub use registry::BackendRegistry;

pub use ftpgate_core::storage::{ByteStream, Error, ErrorKind, Fileinfo, Metadata, Result, StorageBackend};
