use ftpgate_core::storage::{Error, ErrorKind};

/// Translates an OpenDAL error, which already folds HTTP statuses and service fault codes into
/// its own kinds, into the storage taxonomy.
pub(crate) fn map_err(err: opendal::Error) -> Error {
    let kind = match err.kind() {
        opendal::ErrorKind::NotFound => ErrorKind::NotFound,
        opendal::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
        opendal::ErrorKind::NotADirectory => ErrorKind::NotADirectory,
        opendal::ErrorKind::IsADirectory => ErrorKind::NotFound,
        opendal::ErrorKind::Unsupported => ErrorKind::Unsupported,
        opendal::ErrorKind::RateLimited => ErrorKind::BackendUnavailable,
        opendal::ErrorKind::ConfigInvalid => ErrorKind::BackendUnavailable,
        _ if err.is_temporary() => ErrorKind::BackendUnavailable,
        // Connection failures (refused, DNS, TLS) surface as Unexpected.
        opendal::ErrorKind::Unexpected => ErrorKind::BackendUnavailable,
        _ => ErrorKind::LocalError,
    };
    Error::new(kind, err)
}
