#![deny(missing_docs)]
//! Lifecycle and data events a surrounding control plane can observe.
//!
//! Register a [`PresenceListener`] with [`ServerBuilder::notify_presence`] to learn about logins and
//! disconnects, for instance to report connected users on a status record. Register a
//! [`DataListener`] with [`ServerBuilder::notify_data`] to learn about files that were transferred,
//! removed or renamed.
//!
//! Listeners are awaited inline by the session that produced the event, so they should hand off
//! anything slow.
//!
//! [`ServerBuilder::notify_presence`]: crate::ServerBuilder::notify_presence
//! [`ServerBuilder::notify_data`]: crate::ServerBuilder::notify_data

pub(crate) mod event;
pub(crate) mod nop;

pub use event::{DataEvent, DataListener, EventMeta, PresenceEvent, PresenceListener};
