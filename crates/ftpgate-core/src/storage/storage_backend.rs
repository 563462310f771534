//! Defines the service provider interface for storage back-end implementors.

use super::error::{Error, ErrorKind};
use crate::path::VirtualPath;
use async_trait::async_trait;
use chrono::prelude::{DateTime, Utc};
use std::{
    fmt::{self, Debug, Formatter},
    io::Cursor,
    result,
    time::SystemTime,
};

/// Result type used by traits in this module
pub type Result<T> = result::Result<T, Error>;

/// A byte stream produced by [`StorageBackend::get`] or consumed by [`StorageBackend::put`].
pub type ByteStream = Box<dyn tokio::io::AsyncRead + Send + Unpin>;

/// What [`StorageBackend::metadata`] knows about a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    len: u64,
    is_dir: bool,
    modified: Option<SystemTime>,
}

impl Metadata {
    /// Metadata for a regular file of `len` bytes.
    pub fn file(len: u64, modified: Option<SystemTime>) -> Self {
        Metadata { len, is_dir: false, modified }
    }

    /// Metadata for a directory.
    pub fn dir(modified: Option<SystemTime>) -> Self {
        Metadata {
            len: 0,
            is_dir: true,
            modified,
        }
    }

    /// Returns the length (size) of the file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `self.len() == 0`.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the path is a directory.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Returns true if the path is a file.
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    /// Returns the last modified time of the path. Object stores do not always report one for
    /// directories, hence the error.
    pub fn modified(&self) -> Result<SystemTime> {
        self.modified.ok_or_else(|| Error::from(ErrorKind::LocalError))
    }
}

/// A single directory entry as returned by [`StorageBackend::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fileinfo {
    /// The entry name, without any directory part.
    pub name: String,
    /// The entry's metadata
    pub metadata: Metadata,
}

impl fmt::Display for Fileinfo {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let modified: String = self
            .metadata
            .modified()
            .map(|x| DateTime::<Utc>::from(x).format("%b %d %H:%M").to_string())
            .unwrap_or_else(|_| "--- -- --:--".to_string());
        write!(
            f,
            "{filetype}{permissions} {links:>3} {owner:>8} {group:>8} {size:>14} {modified:>12} {name}",
            filetype = if self.metadata.is_dir() { "d" } else { "-" },
            permissions = if self.metadata.is_dir() { "rwxr-xr-x" } else { "rw-r--r--" },
            links = 1,
            owner = "ftp",
            group = "ftp",
            size = self.metadata.len(),
            modified = modified,
            name = self.name,
        )
    }
}

/// The capability set every storage back-end (filesystem, object store, WebDAV) implements.
///
/// All paths are [`VirtualPath`]s relative to the back-end's own root, already normalized and
/// already checked against the session's confinement. Implementations must be safe to share
/// between sessions working on different paths concurrently and must translate their native
/// errors into [`ErrorKind`]s.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// Implement to set the name of the storage back-end. By default it returns the type signature.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Returns the `Metadata` for the given path or [`ErrorKind::NotFound`].
    async fn metadata(&self, path: &VirtualPath) -> Result<Metadata>;

    /// Returns the entries of the given directory. Fails with [`ErrorKind::NotADirectory`] if the
    /// path is a file.
    async fn list(&self, path: &VirtualPath) -> Result<Vec<Fileinfo>>;

    /// Returns some bytes that make up a directory listing that can immediately be sent to the
    /// client. Entries are sorted by name.
    #[tracing_attributes::instrument]
    async fn list_fmt(&self, path: &VirtualPath) -> Result<Cursor<Vec<u8>>> {
        let mut list = self.list(path).await?;
        list.sort_by(|a, b| a.name.cmp(&b.name));
        let file_infos: Vec<u8> = list.iter().map(|fi| format!("{}\r\n", fi)).collect::<String>().into_bytes();
        Ok(Cursor::new(file_infos))
    }

    /// Returns some bytes that make up a NLST directory listing (only the names), sorted.
    #[tracing_attributes::instrument]
    async fn nlst(&self, path: &VirtualPath) -> Result<Cursor<Vec<u8>>> {
        let mut names: Vec<String> = self.list(path).await?.into_iter().map(|fi| fi.name).collect();
        names.sort();
        let bytes = names.iter().map(|name| format!("{}\r\n", name)).collect::<String>().into_bytes();
        Ok(Cursor::new(bytes))
    }

    /// Opens the given file for reading, starting at `start_pos`.
    async fn get(&self, path: &VirtualPath, start_pos: u64) -> Result<ByteStream>;

    /// Writes everything `input` yields to the given file, replacing it or, with `append`, adding
    /// to its end. Returns the number of bytes written.
    async fn put(&self, input: ByteStream, path: &VirtualPath, append: bool) -> Result<u64>;

    /// Deletes the given file.
    async fn del(&self, path: &VirtualPath) -> Result<()>;

    /// Creates the given directory.
    async fn mkd(&self, path: &VirtualPath) -> Result<()>;

    /// Renames the given file or directory.
    async fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<()>;

    /// Deletes the given, empty, directory.
    async fn rmd(&self, path: &VirtualPath) -> Result<()>;

    /// Succeeds if the path exists and is a directory.
    async fn cwd(&self, path: &VirtualPath) -> Result<()> {
        let metadata = self.metadata(path).await?;
        if metadata.is_dir() { Ok(()) } else { Err(ErrorKind::NotADirectory.into()) }
    }
}
