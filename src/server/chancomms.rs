//! Messages exchanged between the control loop, the command handlers and the data channel tasks.

use super::{controlchan::Reply, session::TraceId};
use crate::storage;
use ftpgate_core::path::VirtualPath;
use std::fmt;

// Sent from a transfer command handler to the task that owns the passive data connection.
#[derive(PartialEq, Eq, Debug)]
pub enum DataChanCmd {
    Retr { path: VirtualPath },
    Stor { path: VirtualPath },
    Appe { path: VirtualPath },
    List { path: VirtualPath },
    Nlst { path: VirtualPath },
}

/// Messages the control loop receives from handlers and data channel tasks. Most of them end up as
/// a reply to the client and some of them as a notification event as well.
#[derive(Debug)]
pub enum ControlChanMsg {
    /// RETR finished
    SentData { path: VirtualPath, bytes: u64 },
    /// STOR or APPE finished
    WrittenData { path: VirtualPath, bytes: u64 },
    /// LIST or NLST finished
    DirectorySuccessfullyListed,
    /// The backend failed during a transfer
    StorageError(storage::Error),
    /// The data connection broke off mid transfer
    ConnectionReset,
    /// Nobody connected to the passive port in time
    DataConnectionTimedOut,
    /// PASS was accepted
    AuthSuccess { username: String, trace_id: TraceId },
    /// PASS was rejected
    AuthFailed,
    DelFileSuccess { path: VirtualPath },
    RmDirSuccess { path: VirtualPath },
    MkDirSuccess { path: VirtualPath },
    RenameSuccess { old_path: VirtualPath, new_path: VirtualPath },
    /// Close the control connection after the pending replies went out
    ExitControlLoop,
    /// Send this reply on the control connection
    CommandChannelReply(Reply),
}

impl fmt::Display for ControlChanMsg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
