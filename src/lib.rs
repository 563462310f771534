//! ftpgate is an async FTP server engine that puts filesystem, S3-compatible object storage and
//! WebDAV storage behind one FTP endpoint.
//!
//! Who may log in, what they may do and where their files live is not configured on the server
//! but read, on every login, from a [`ControlPlane`](controlplane::ControlPlane): a user record
//! names a home directory, a chroot flag, a permission set and a backend binding, and the backend
//! record says how to reach the storage. Changing records changes behaviour from the next login on.
//!
//! Only passive mode is served. Passive ports are leased from one shared pool and taken back when
//! the client does not connect in time.
//!
//! # Quick start
//!
//! ```no_run
//! use ftpgate::{
//!     ServerBuilder,
//!     auth::{BackendBinding, BackendKind},
//!     controlplane::{BackendConfig, InMemoryControlPlane, Permission, UserRecord},
//!     path::VirtualPath,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ftpgate::ServerError> {
//!     let control_plane = InMemoryControlPlane::new();
//!     control_plane.upsert_backend("public", None, BackendConfig::Filesystem { root: "/srv/ftp".into() }).await;
//!     control_plane
//!         .upsert_user(UserRecord {
//!             username: "anonymous".into(),
//!             disabled: false,
//!             home: VirtualPath::new("/pub"),
//!             chroot: true,
//!             permissions: vec![Permission::Read, Permission::List],
//!             credential: None,
//!             backend: BackendBinding::new(BackendKind::Filesystem, "public"),
//!         })
//!         .await;
//!
//!     let server = ServerBuilder::new(Arc::new(control_plane))
//!         .greeting("Welcome to my FTP server")
//!         .passive_ports(50000..=50100)
//!         .build()?;
//!     server.listen(async { let _ = tokio::signal::ctrl_c().await; }).await
//! }
//! ```

pub mod auth;
pub mod notification;
pub mod options;
pub mod storage;

mod server;

pub use ftpgate_core::{controlplane, path};
pub use server::ftpserver::{Server, ServerBuilder, ServerError};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
