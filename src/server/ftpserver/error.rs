//! Contains the error type used by `Server`

use crate::BoxError;

use std::net::AddrParseError;
use thiserror::Error;

/// Error returned by [`ServerBuilder::build`](crate::ServerBuilder::build),
/// [`Server::listen`](crate::Server::listen) and by the configuration loaders in
/// [`options`](crate::options).
#[derive(Error, Debug)]
#[error("server error: {msg}")]
pub struct ServerError {
    msg: String,
    #[source]
    source: Option<BoxError>,
}

impl ServerError {
    fn new<E: Into<BoxError>>(msg: impl Into<String>, source: E) -> ServerError {
        ServerError {
            msg: msg.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> ServerError {
        ServerError { msg: msg.into(), source: None }
    }
}

impl From<AddrParseError> for ServerError {
    fn from(e: AddrParseError) -> Self {
        ServerError::new("could not parse address", e)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::new("io error", e)
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::new("invalid configuration document", e)
    }
}
