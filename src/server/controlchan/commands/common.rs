use crate::{
    auth::Permissions,
    server::{
        controlchan::{Reply, ReplyCode, handler::CommandContext},
        session::Session,
    },
    storage::{self, StorageBackend},
};
use ftpgate_core::path::VirtualPath;
use std::sync::Arc;

// Resolves the client's path argument and checks the logged in user holds `required` for it.
// Returns the reply to send instead when either fails.
pub(super) fn authorize(session: &Session, input: &str, required: Permissions) -> Result<VirtualPath, Reply> {
    let permitted = session.identity.as_ref().is_some_and(|identity| identity.may(required));
    if !permitted {
        return Err(Reply::new(ReplyCode::FileError, "Permission denied"));
    }
    session.resolve(input).map_err(Reply::from)
}

// Authorizes `input` and fetches the session's backend, releasing the session lock before the
// caller goes to storage.
pub(super) async fn prepare(args: &CommandContext, input: &str, required: Permissions) -> Result<(VirtualPath, Arc<dyn StorageBackend>), Reply> {
    let mut session = args.session.lock().await;
    let path = authorize(&session, input, required)?;
    let storage = session
        .storage(&args.registry)
        .await
        .map_err(|err| storage_failure(&args.logger, "Backend resolution", err))?;
    Ok((path, storage))
}

pub(super) fn storage_failure(logger: &slog::Logger, what: &str, err: storage::Error) -> Reply {
    if err.kind().is_transient() {
        slog::warn!(logger, "{} failed: {}", what, err; "kind" => ?err.kind());
    } else {
        slog::info!(logger, "{} refused: {}", what, err; "kind" => ?err.kind());
    }
    Reply::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftpgate_core::auth::{BackendBinding, BackendKind, Identity};
    use pretty_assertions::assert_eq;

    fn session(permissions: Permissions) -> Session {
        let mut session = Session::new();
        session.login(Identity {
            username: "anonymous".into(),
            home: VirtualPath::new("/pub"),
            chroot: true,
            permissions,
            backend: BackendBinding::new(BackendKind::Filesystem, "public"),
        });
        session
    }

    #[test]
    fn missing_permission_is_550() {
        let session = session(Permissions::READ | Permissions::LIST);
        let reply = authorize(&session, "upload.bin", Permissions::WRITE).unwrap_err();
        assert_eq!(reply.code(), Some(ReplyCode::FileError));
    }

    #[test]
    fn escaping_home_is_550() {
        let session = session(Permissions::READ | Permissions::LIST);
        let reply = authorize(&session, "/etc/passwd", Permissions::READ).unwrap_err();
        assert_eq!(reply.code(), Some(ReplyCode::FileError));
    }

    #[test]
    fn permitted_paths_resolve_against_cwd() {
        let session = session(Permissions::READ | Permissions::LIST);
        assert_eq!(authorize(&session, "docs/a.txt", Permissions::READ).unwrap().as_str(), "/pub/docs/a.txt");
    }
}
