use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

/// A user logged in or a logged in session ended. The user and session are identified by the
/// accompanying [`EventMeta`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    /// PASS was accepted.
    LoggedIn,
    /// The session of a logged in user ended, whether through QUIT, a timeout, a protocol
    /// violation, server shutdown or the client hanging up.
    LoggedOut,
}

/// A change the session made to, or a read it did from, the user's backend. Paths are the virtual
/// paths the session resolved, not the client's spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEvent {
    /// RETR completed
    Got {
        /// The file that was sent
        path: String,
        /// Bytes sent to the client
        bytes: u64,
    },
    /// STOR or APPE completed
    Put {
        /// The file that was written
        path: String,
        /// Bytes received from the client
        bytes: u64,
    },
    /// DELE succeeded
    Deleted {
        /// The removed file
        path: String,
    },
    /// MKD succeeded
    MadeDir {
        /// The new directory
        path: String,
    },
    /// RMD succeeded
    RemovedDir {
        /// The removed directory
        path: String,
    },
    /// RNFR followed by RNTO succeeded
    Renamed {
        /// The old path
        from: String,
        /// The new path
        to: String,
    },
}

/// Who an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMeta {
    /// The logged in user. One user can have several sessions.
    pub username: String,
    /// The session's trace id, as it appears in the logs.
    pub trace_id: String,
    /// Starts at 1 and increments with every event of the session, so that events can be ordered
    /// by receivers that do not preserve delivery order.
    pub sequence_number: u64,
}

/// Receives [`DataEvent`]s.
#[async_trait]
pub trait DataListener: Sync + Send + Debug {
    /// Called after the operation completed.
    async fn receive_data_event(&self, e: DataEvent, m: EventMeta);
}

/// Receives [`PresenceEvent`]s.
#[async_trait]
pub trait PresenceListener: Sync + Send + Debug {
    /// Called after the login or disconnect.
    async fn receive_presence_event(&self, e: PresenceEvent, m: EventMeta);
}

#[async_trait]
impl DataListener for Arc<dyn DataListener> {
    async fn receive_data_event(&self, e: DataEvent, m: EventMeta) {
        self.as_ref().receive_data_event(e, m).await
    }
}

#[async_trait]
impl PresenceListener for Arc<dyn PresenceListener> {
    async fn receive_presence_event(&self, e: PresenceEvent, m: EventMeta) {
        self.as_ref().receive_presence_event(e, m).await
    }
}
