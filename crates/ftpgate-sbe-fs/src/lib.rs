//! An ftpgate [`StorageBackend`] that keeps files in a directory on local disk.
//!
//! All access goes through a `cap_std` directory handle opened on the configured base directory,
//! so neither `..` segments nor symlinks can reach anything outside of it.
//!
//! ```no_run
//! use ftpgate_core::{path::VirtualPath, storage::StorageBackend};
//! use ftpgate_sbe_fs::Filesystem;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let fs = Filesystem::new(std::env::temp_dir())?;
//! let listing = fs.list(&VirtualPath::root()).await?;
//! # Ok(())
//! # }
//! ```

mod cap_fs;

use async_trait::async_trait;
use ftpgate_core::{
    path::VirtualPath,
    storage::{ByteStream, Error, ErrorKind, Fileinfo, Metadata, Result, StorageBackend},
};
use futures::{future::TryFutureExt, stream::TryStreamExt};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// The Filesystem struct is an implementation of the StorageBackend trait that keeps its files
/// inside a specific root directory on local disk.
#[derive(Debug)]
pub struct Filesystem {
    root_fd: Arc<cap_std::fs::Dir>,
    root: PathBuf,
}

/// Maps a virtual path onto a path relative to the root handle.
fn relative(path: &VirtualPath) -> &Path {
    if path.is_root() { Path::new(".") } else { Path::new(path.relative()) }
}

fn convert(meta: cap_std::fs::Metadata) -> Metadata {
    let modified = meta.modified().ok().map(cap_std::time::SystemTime::into_std);
    if meta.is_dir() { Metadata::dir(modified) } else { Metadata::file(meta.len(), modified) }
}

impl Filesystem {
    /// Create a new Filesystem backend, with the given root. No operations can take place outside
    /// of the root. For example, when the `Filesystem` root is set to `/srv/ftp`, and a client
    /// asks for `hello.txt`, the server will send it `/srv/ftp/hello.txt`.
    pub fn new<P: Into<PathBuf>>(root: P) -> io::Result<Self> {
        let path = root.into();
        let aa = cap_std::ambient_authority();
        let root_fd = Arc::new(cap_std::fs::Dir::open_ambient_dir(&path, aa)?);
        Ok(Filesystem { root_fd, root: path })
    }

    /// The directory this back-end is confined to.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageBackend for Filesystem {
    fn name(&self) -> &str {
        "filesystem"
    }

    #[tracing_attributes::instrument]
    async fn metadata(&self, path: &VirtualPath) -> Result<Metadata> {
        let fs_meta = cap_fs::metadata(self.root_fd.clone(), relative(path)).await?;
        Ok(convert(fs_meta))
    }

    #[tracing_attributes::instrument]
    async fn list(&self, path: &VirtualPath) -> Result<Vec<Fileinfo>> {
        let dir = relative(path).to_path_buf();
        let fis: Vec<Fileinfo> = cap_fs::read_dir(self.root_fd.clone(), &dir)
            .and_then(|dirent| {
                let name = dirent.file_name().to_string_lossy().into_owned();
                let fullpath = dir.join(&name);
                cap_fs::metadata(self.root_fd.clone(), fullpath).map_ok(move |meta| Fileinfo {
                    name,
                    metadata: convert(meta),
                })
            })
            .try_collect()
            .await?;
        Ok(fis)
    }

    #[tracing_attributes::instrument]
    async fn get(&self, path: &VirtualPath, start_pos: u64) -> Result<ByteStream> {
        let file = cap_fs::open(self.root_fd.clone(), relative(path)).await?;
        let mut file = tokio::fs::File::from_std(file.into_std());
        if file.metadata().await?.is_dir() {
            return Err(ErrorKind::NotFound.into());
        }
        if start_pos > 0 {
            file.seek(std::io::SeekFrom::Start(start_pos)).await?;
        }
        Ok(Box::new(tokio::io::BufReader::with_capacity(4096, file)))
    }

    async fn put(&self, input: ByteStream, path: &VirtualPath, append: bool) -> Result<u64> {
        let mut oo = cap_std::fs::OpenOptions::new();
        oo.create(true);
        if append {
            oo.append(true);
        } else {
            oo.write(true).truncate(true);
        }
        let file = cap_fs::open_with(self.root_fd.clone(), relative(path), oo).await?;
        let file = tokio::fs::File::from_std(file.into_std());

        let mut reader = tokio::io::BufReader::with_capacity(4096, input);
        let mut writer = tokio::io::BufWriter::with_capacity(4096, file);

        let bytes_copied = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.flush().await?;
        Ok(bytes_copied)
    }

    #[tracing_attributes::instrument]
    async fn del(&self, path: &VirtualPath) -> Result<()> {
        cap_fs::remove_file(self.root_fd.clone(), relative(path)).await.map_err(Error::from)
    }

    #[tracing_attributes::instrument]
    async fn mkd(&self, path: &VirtualPath) -> Result<()> {
        cap_fs::create_dir(self.root_fd.clone(), relative(path)).await.map_err(Error::from)
    }

    #[tracing_attributes::instrument]
    async fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<()> {
        if from.is_root() || to.is_root() {
            return Err(ErrorKind::PermissionDenied.into());
        }
        // Surface a missing source as NotFound rather than whatever rename(2) reports.
        cap_fs::metadata(self.root_fd.clone(), relative(from)).await?;
        cap_fs::rename(self.root_fd.clone(), relative(from), relative(to)).await.map_err(Error::from)
    }

    #[tracing_attributes::instrument]
    async fn rmd(&self, path: &VirtualPath) -> Result<()> {
        if path.is_root() {
            return Err(ErrorKind::PermissionDenied.into());
        }
        cap_fs::remove_dir(self.root_fd.clone(), relative(path)).await.map_err(Error::from)
    }
}
