//! Contains the `Server` and everything that runs inside it.

mod chancomms;
mod controlchan;
mod datachan;
pub(crate) mod ftpserver;
mod password;
mod portalloc;
mod session;
mod shutdown;
