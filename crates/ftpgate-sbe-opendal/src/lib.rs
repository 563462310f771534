//! ftpgate [`StorageBackend`]s for S3-compatible object stores and WebDAV servers.
//!
//! Both are served by [`OpendalBackend`], which drives an [Apache OpenDAL] `Operator`. OpenDAL
//! talks the wire protocols; this crate maps FTP's view of a filesystem onto it:
//!
//! * Object stores have no real directories. A directory exists if a `name/` marker object exists
//!   or if any object has `name/` as prefix. `MKD` writes such a marker.
//! * Rename and append are used natively when the service supports them and emulated with
//!   copy-and-delete and read-and-rewrite otherwise.
//!
//! [Apache OpenDAL]: https://opendal.apache.org

mod err;

use async_trait::async_trait;
use err::map_err;
use ftpgate_core::{
    path::VirtualPath,
    storage::{ByteStream, ErrorKind, Fileinfo, Metadata, Result, StorageBackend},
};
use futures::TryStreamExt;
use opendal::{EntryMode, Operator, services};
use std::time::SystemTime;
use tokio::io::AsyncReadExt;
use tokio_util::compat::FuturesAsyncReadCompatExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// A [`StorageBackend`] on top of an OpenDAL [`Operator`].
#[derive(Debug, Clone)]
pub struct OpendalBackend {
    op: Operator,
    name: &'static str,
}

/// Connection parameters of an S3-compatible bucket.
#[derive(Debug, Clone, Default)]
pub struct S3Options<'a> {
    /// The service endpoint, e.g. `http://127.0.0.1:9000`.
    pub endpoint: &'a str,
    /// Defaults to `us-east-1` when empty.
    pub region: &'a str,
    /// The bucket
    pub bucket: &'a str,
    /// Key prefix the backend root maps onto. Empty for the bucket root.
    pub root: &'a str,
    /// The access key id
    pub access_key_id: &'a str,
    /// The secret access key
    pub secret_access_key: &'a str,
}

/// Connection parameters of a WebDAV server.
#[derive(Debug, Clone, Default)]
pub struct WebdavOptions<'a> {
    /// The server URL
    pub endpoint: &'a str,
    /// Login name, if the server wants one.
    pub username: Option<&'a str>,
    /// Password, if the server wants one.
    pub password: Option<&'a str>,
    /// Collection the backend root maps onto. Empty for the server root.
    pub root: &'a str,
}

impl OpendalBackend {
    /// Builds a back-end for an S3-compatible bucket. Credentials are taken from `options` only,
    /// never from the environment or instance metadata.
    pub fn s3(options: &S3Options<'_>) -> Result<Self> {
        let region = if options.region.is_empty() { "us-east-1" } else { options.region };
        let builder = services::S3::default()
            .endpoint(options.endpoint)
            .region(region)
            .bucket(options.bucket)
            .root(&root_dir(options.root))
            .access_key_id(options.access_key_id)
            .secret_access_key(options.secret_access_key)
            .disable_config_load()
            .disable_ec2_metadata();
        let op = Operator::new(builder).map_err(map_err)?.finish();
        Ok(OpendalBackend { op, name: "objectstore" })
    }

    /// Builds a back-end for a WebDAV server.
    pub fn webdav(options: &WebdavOptions<'_>) -> Result<Self> {
        let mut builder = services::Webdav::default().endpoint(options.endpoint).root(&root_dir(options.root));
        if let Some(username) = options.username {
            builder = builder.username(username);
        }
        if let Some(password) = options.password {
            builder = builder.password(password);
        }
        let op = Operator::new(builder).map_err(map_err)?.finish();
        Ok(OpendalBackend { op, name: "webdav" })
    }

    /// Wraps an existing operator, for services this crate has no constructor for.
    pub fn from_operator(op: Operator) -> Self {
        OpendalBackend { op, name: "opendal" }
    }

    /// The wrapped operator.
    pub fn operator(&self) -> &Operator {
        &self.op
    }

    /// Whether anything lives at or below `name/`.
    async fn dir_exists(&self, path: &VirtualPath) -> Result<bool> {
        if path.is_root() {
            return Ok(true);
        }
        let mut lister = match self.op.lister(&dir_key(path)).await {
            Ok(lister) => lister,
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(map_err(e)),
        };
        Ok(lister.try_next().await.map_err(map_err)?.is_some())
    }

    /// Stats `path` as a file, `None` if there is no such object.
    async fn file_metadata(&self, path: &VirtualPath) -> Result<Option<Metadata>> {
        if path.is_root() {
            return Ok(None);
        }
        match self.op.stat(&file_key(path)).await {
            Ok(meta) => Ok(Some(convert(&meta))),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }

    async fn read_existing(&self, key: &str) -> Result<Vec<u8>> {
        match self.op.read(key).await {
            Ok(buf) => Ok(buf.to_vec()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(map_err(e)),
        }
    }
}

fn root_dir(root: &str) -> String {
    let trimmed = root.trim_matches('/');
    if trimmed.is_empty() { String::from("/") } else { format!("/{trimmed}/") }
}

fn file_key(path: &VirtualPath) -> String {
    path.relative().to_string()
}

fn dir_key(path: &VirtualPath) -> String {
    if path.is_root() { String::from("/") } else { format!("{}/", path.relative()) }
}

fn convert(meta: &opendal::Metadata) -> Metadata {
    let modified = meta.last_modified().map(SystemTime::from);
    match meta.mode() {
        EntryMode::DIR => Metadata::dir(modified),
        _ => Metadata::file(meta.content_length(), modified),
    }
}

#[async_trait]
impl StorageBackend for OpendalBackend {
    fn name(&self) -> &str {
        self.name
    }

    #[tracing_attributes::instrument]
    async fn metadata(&self, path: &VirtualPath) -> Result<Metadata> {
        if let Some(meta) = self.file_metadata(path).await? {
            return Ok(meta);
        }
        if self.dir_exists(path).await? {
            return Ok(Metadata::dir(None));
        }
        Err(ErrorKind::NotFound.into())
    }

    #[tracing_attributes::instrument]
    async fn list(&self, path: &VirtualPath) -> Result<Vec<Fileinfo>> {
        if let Some(meta) = self.file_metadata(path).await? {
            if meta.is_file() {
                return Err(ErrorKind::NotADirectory.into());
            }
        }
        let key = dir_key(path);
        let entries = self.op.list(&key).await.map_err(map_err)?;
        if entries.is_empty() && !path.is_root() {
            return Err(ErrorKind::NotFound.into());
        }
        Ok(entries
            .iter()
            .filter(|e| e.path() != key && !e.path().is_empty() && e.path() != "/")
            .map(|e| Fileinfo {
                name: e.name().trim_end_matches('/').to_string(),
                metadata: convert(e.metadata()),
            })
            .collect())
    }

    #[tracing_attributes::instrument]
    async fn get(&self, path: &VirtualPath, start_pos: u64) -> Result<ByteStream> {
        match self.file_metadata(path).await? {
            Some(meta) if meta.is_file() => {}
            _ => return Err(ErrorKind::NotFound.into()),
        }
        let reader = self.op.reader(&file_key(path)).await.map_err(map_err)?;
        let stream = reader.into_futures_async_read(start_pos..).await.map_err(map_err)?;
        Ok(Box::new(stream.compat()))
    }

    async fn put(&self, mut input: ByteStream, path: &VirtualPath, append: bool) -> Result<u64> {
        if path.is_root() || self.dir_exists(path).await? {
            return Err(ErrorKind::FileNameNotAllowed.into());
        }
        let key = file_key(path);
        let native_append = append && self.op.info().full_capability().write_can_append;
        let mut writer = if native_append {
            self.op.writer_with(&key).append(true).await
        } else {
            self.op.writer(&key).await
        }
        .map_err(map_err)?;

        let existing = if append && !native_append {
            self.read_existing(&key).await
        } else {
            Ok(Vec::new())
        };
        let written = match existing {
            Ok(existing) => fill(&mut writer, existing, &mut input).await,
            Err(err) => Err(err),
        };
        match written {
            Ok(total) => Ok(total),
            Err(err) => {
                // Leaves no half written object or dangling multipart upload behind.
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(key = %key, "Could not abort upload: {}", abort_err);
                }
                Err(err)
            }
        }
    }

    #[tracing_attributes::instrument]
    async fn del(&self, path: &VirtualPath) -> Result<()> {
        match self.file_metadata(path).await? {
            Some(meta) if meta.is_file() => self.op.delete(&file_key(path)).await.map_err(map_err),
            _ => Err(ErrorKind::NotFound.into()),
        }
    }

    #[tracing_attributes::instrument]
    async fn mkd(&self, path: &VirtualPath) -> Result<()> {
        if path.is_root() || self.file_metadata(path).await?.is_some() {
            return Err(ErrorKind::FileNameNotAllowed.into());
        }
        if let Some(parent) = path.parent() {
            if !self.dir_exists(&parent).await? {
                return Err(ErrorKind::NotFound.into());
            }
        }
        self.op.create_dir(&dir_key(path)).await.map_err(map_err)
    }

    #[tracing_attributes::instrument]
    async fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<()> {
        match self.file_metadata(from).await? {
            Some(meta) if meta.is_file() => {}
            // Renaming a prefix means rewriting every object below it.
            _ if self.dir_exists(from).await? => return Err(ErrorKind::Unsupported.into()),
            _ => return Err(ErrorKind::NotFound.into()),
        }
        let (from, to) = (file_key(from), file_key(to));
        let capability = self.op.info().full_capability();
        if capability.rename {
            return self.op.rename(&from, &to).await.map_err(map_err);
        }
        if capability.copy {
            self.op.copy(&from, &to).await.map_err(map_err)?;
        } else {
            let data = self.op.read(&from).await.map_err(map_err)?;
            self.op.write(&to, data).await.map_err(map_err)?;
        }
        self.op.delete(&from).await.map_err(map_err)
    }

    #[tracing_attributes::instrument]
    async fn rmd(&self, path: &VirtualPath) -> Result<()> {
        if path.is_root() {
            return Err(ErrorKind::PermissionDenied.into());
        }
        let entries = self.list(path).await?;
        if !entries.is_empty() {
            return Err(ErrorKind::DirectoryNotEmpty.into());
        }
        self.op.delete(&dir_key(path)).await.map_err(map_err)
    }
}


// Writes `existing` followed by everything in `input` and commits the object.
async fn fill(writer: &mut opendal::Writer, existing: Vec<u8>, input: &mut ByteStream) -> Result<u64> {
    if !existing.is_empty() {
        writer.write(existing).await.map_err(map_err)?;
    }
    let mut total = 0u64;
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = input.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write(buf[..n].to_vec()).await.map_err(map_err)?;
        total += n as u64;
    }
    writer.close().await.map_err(map_err)?;
    Ok(total)
}
