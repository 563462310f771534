//! Contains the [`StorageBackend`] trait that the filesystem, object-store and WebDAV adapters
//! implement, the types they exchange with the session engine and the shared error taxonomy.
//!
//! The session engine hands every call a normalized [`VirtualPath`](crate::path::VirtualPath) that
//! has already been checked against the user's home directory, so adapters only need to map it
//! onto their own root.

mod error;
pub use error::{Error, ErrorKind};

pub(crate) mod storage_backend;
pub use storage_backend::{ByteStream, Fileinfo, Metadata, Result, StorageBackend};
