use crate::BoxError;
use derive_more::Display;
use thiserror::Error;

/// The Error returned by storage back-ends. Implementations translate whatever their native client
/// reports (I/O errors, HTTP statuses, service fault codes) into an [`ErrorKind`] at the adapter
/// boundary since that kind alone determines what the FTP client gets to see.
#[derive(Debug, Error)]
#[error("storage error: {kind}")]
pub struct Error {
    kind: ErrorKind,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    /// Creates a new storage error
    pub fn new<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error {
            kind,
            source: Some(error.into()),
        }
    }

    /// Detailed information about what the FTP server should do with the failure
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Attempts to get a reference to the inner `std::io::Error` if there is one.
    pub fn get_io_error(&self) -> Option<&std::io::Error> {
        self.source.as_ref()?.downcast_ref::<std::io::Error>()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            std::io::ErrorKind::NotADirectory => ErrorKind::NotADirectory,
            std::io::ErrorKind::DirectoryNotEmpty => ErrorKind::DirectoryNotEmpty,
            std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded => ErrorKind::InsufficientStorage,
            std::io::ErrorKind::InvalidFilename => ErrorKind::FileNameNotAllowed,
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::NotConnected => ErrorKind::BackendUnavailable,
            _ => ErrorKind::LocalError,
        };
        Error::new(kind, err)
    }
}

/// The shared failure taxonomy every [`StorageBackend`] maps its errors into.
///
/// [`StorageBackend`]: super::StorageBackend
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ErrorKind {
    /// The path does not exist. Replied to with 550.
    #[display("550 File not found")]
    NotFound,
    /// The back-end refused the operation. Replied to with 550.
    #[display("550 Permission denied")]
    PermissionDenied,
    /// A directory operation was attempted on something that is not a directory. Replied to with
    /// 550.
    #[display("550 Not a directory")]
    NotADirectory,
    /// RMD on a directory that still has entries. Replied to with 550.
    #[display("550 Directory not empty")]
    DirectoryNotEmpty,
    /// The back-end could not be reached or constructed, or reported a fault that may go away when
    /// retried. Replied to with 451 and the session stays usable.
    #[display("451 Backend unavailable")]
    BackendUnavailable,
    /// The back-end rejected the file name. Replied to with 553.
    #[display("553 File name not allowed")]
    FileNameNotAllowed,
    /// Out of space or over quota. Replied to with 452.
    #[display("452 Insufficient storage space")]
    InsufficientStorage,
    /// The back-end kind cannot perform this operation. Replied to with 502.
    #[display("502 Operation not supported by backend")]
    Unsupported,
    /// Anything else that went wrong inside the adapter. Replied to with 451.
    #[display("451 Local error")]
    LocalError,
}

impl ErrorKind {
    /// Transient kinds are reported with a 4xx reply; the client may retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::BackendUnavailable | ErrorKind::InsufficientStorage | ErrorKind::LocalError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.get_io_error().is_some());
    }

    #[test]
    fn io_connection_refused_is_backend_unavailable() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert!(err.kind().is_transient());
    }

    #[test]
    fn permanent_kinds_are_not_transient() {
        for kind in [ErrorKind::NotFound, ErrorKind::PermissionDenied, ErrorKind::NotADirectory] {
            assert!(!kind.is_transient(), "{kind} should be permanent");
        }
    }
}
