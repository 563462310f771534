//! Per control connection state.

use super::chancomms::DataChanCmd;
use crate::storage::{self, BackendRegistry, ErrorKind, StorageBackend};
use ftpgate_core::{auth::Identity, path::VirtualPath};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::sync::{Mutex, mpsc};

// The session shared between the control loop, the command handlers and the data channel tasks.
pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    // Nobody identified yet
    New,
    // USER received, waiting for PASS
    WaitPass,
    // Logged in, no data connection pending
    WaitCmd,
    // PASV answered, waiting for the client's data connection and/or a transfer command
    AwaitingDataConnection,
    // A transfer command was handed to the data channel
    Transferring,
}

impl SessionState {
    pub fn is_logged_in(self) -> bool {
        !matches!(self, SessionState::New | SessionState::WaitPass)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Ascii,
    Image,
}

/// Identifies a session in logs and notification events.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TraceId(u64);

impl TraceId {
    pub fn new() -> Self {
        static FALLBACK: AtomicU64 = AtomicU64::new(0);
        let id = getrandom::u64().unwrap_or_else(|_| {
            let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or_default();
            nanos ^ FALLBACK.fetch_add(1, Ordering::Relaxed)
        });
        TraceId(id)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// This is where we keep the state for a ftp session.
pub struct Session {
    pub trace_id: TraceId,
    pub state: SessionState,
    // The name given with USER, until PASS succeeds or fails.
    pub username: Option<String>,
    pub identity: Option<Identity>,
    // Resolved lazily; stays None while the backend cannot be constructed.
    pub storage: Option<Arc<dyn StorageBackend>>,
    pub cwd: VirtualPath,
    pub data_type: DataType,
    pub rename_from: Option<VirtualPath>,
    // Held by the control channel while a PASV is outstanding. The receiving halves live in the
    // task that accepts and serves the data connection.
    pub data_cmd_tx: Option<mpsc::Sender<DataChanCmd>>,
    pub data_abort_tx: Option<mpsc::Sender<()>>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            trace_id: TraceId::new(),
            state: SessionState::New,
            username: None,
            identity: None,
            storage: None,
            cwd: VirtualPath::root(),
            data_type: DataType::Ascii,
            rename_from: None,
            data_cmd_tx: None,
            data_abort_tx: None,
        }
    }

    // Makes the session logged in as `identity`, starting out in its home directory.
    pub fn login(&mut self, identity: Identity) {
        self.cwd = identity.home.clone();
        self.identity = Some(identity);
        self.username = None;
        self.state = SessionState::WaitCmd;
    }

    // Turns a client supplied path into the virtual path it names, relative to the working
    // directory. `..` never climbs above the user's floor and results the user may not reach
    // are rejected before any backend sees them.
    pub fn resolve(&self, input: &str) -> storage::Result<VirtualPath> {
        let identity = self.identity.as_ref().ok_or(ErrorKind::PermissionDenied)?;
        let path = self.cwd.resolve(input, &identity.floor());
        if identity.can_reach(&path) {
            Ok(path)
        } else {
            Err(ErrorKind::PermissionDenied.into())
        }
    }

    // The backend of the logged in user, built on first use. A failed construction is retried on
    // the next call.
    pub async fn storage(&mut self, registry: &BackendRegistry) -> storage::Result<Arc<dyn StorageBackend>> {
        if let Some(storage) = &self.storage {
            return Ok(Arc::clone(storage));
        }
        let identity = self.identity.as_ref().ok_or(ErrorKind::PermissionDenied)?;
        let storage = registry.get(&identity.backend).await?;
        self.storage = Some(Arc::clone(&storage));
        Ok(storage)
    }

    // Drops the channels to any pending data connection. The accept task or data task on the
    // other end sees the abort channel close, stops, and releases its port lease.
    pub fn close_data_channel(&mut self) {
        self.data_cmd_tx = None;
        self.data_abort_tx = None;
        if matches!(self.state, SessionState::AwaitingDataConnection | SessionState::Transferring) {
            self.state = SessionState::WaitCmd;
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("trace_id", &self.trace_id)
            .field("state", &self.state)
            .field("identity", &self.identity)
            .field("cwd", &self.cwd)
            .field("data_type", &self.data_type)
            .field("rename_from", &self.rename_from)
            .finish()
    }
}
