use ftpgate_core::{
    auth::{AuthenticationError, Identity},
    controlplane::{ControlPlane, LookupError, SecretValue, UserRecord},
};
use std::{fmt, sync::Arc, time::Duration};
use subtle::ConstantTimeEq;

// Compared against when there is nothing to compare against, so every rejected login costs the
// same comparison.
const DUMMY_CREDENTIAL: &[u8] = b"ftpgate-no-such-credential";

/// Turns a username and the credential the client sent into an [`Identity`], consulting a
/// [`ControlPlane`] for the user record and, if the record points at one, the secret holding the
/// expected credential.
///
/// Every kind of failure (unknown user, disabled user, wrong credential, missing secret, control
/// plane unreachable) yields the same [`AuthenticationError`] after the same delay. The reason is
/// only logged.
///
/// A record without a credential accepts any password. That is how anonymous access is set up:
///
/// ```json
/// {"username": "anonymous", "home": "/pub", "chroot": true, "permissions": ["read", "list"],
///  "backend": {"kind": "filesystem", "name": "public"}}
/// ```
pub struct Resolver {
    control_plane: Arc<dyn ControlPlane>,
    failed_login_delay: Duration,
    logger: slog::Logger,
}

#[derive(Debug)]
enum Rejection {
    UnknownUser,
    Disabled,
    BadCredential,
    SecretNotFound,
    Lookup(LookupError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::UnknownUser => write!(f, "no such user"),
            Rejection::Disabled => write!(f, "user is disabled"),
            Rejection::BadCredential => write!(f, "credential mismatch"),
            Rejection::SecretNotFound => write!(f, "credential secret not found"),
            Rejection::Lookup(e) => write!(f, "{}", e),
        }
    }
}

impl From<LookupError> for Rejection {
    fn from(e: LookupError) -> Self {
        Rejection::Lookup(e)
    }
}

impl Resolver {
    /// Creates a resolver that holds back failed logins for `failed_login_delay`.
    pub fn new(control_plane: Arc<dyn ControlPlane>, failed_login_delay: Duration, logger: slog::Logger) -> Self {
        Resolver {
            control_plane,
            failed_login_delay,
            logger,
        }
    }

    /// Resolves `username` and `credential` to an [`Identity`].
    #[tracing_attributes::instrument(skip(self, credential))]
    pub async fn resolve(&self, username: &str, credential: &[u8]) -> Result<Identity, AuthenticationError> {
        match self.check(username, credential).await {
            Ok(identity) => Ok(identity),
            Err(rejection) => {
                slog::warn!(self.logger, "Login rejected: {}", rejection; "username" => username);
                tokio::time::sleep(self.failed_login_delay).await;
                Err(AuthenticationError)
            }
        }
    }

    async fn check(&self, username: &str, credential: &[u8]) -> Result<Identity, Rejection> {
        let record = match self.control_plane.lookup_user(username).await? {
            Some(record) => record,
            None => {
                let _ = credential.ct_eq(DUMMY_CREDENTIAL);
                return Err(Rejection::UnknownUser);
            }
        };
        let expected = match &record.credential {
            None => None,
            Some(SecretValue::Inline(value)) => Some(value.as_bytes().to_vec()),
            Some(SecretValue::Ref(reference)) => match self.control_plane.lookup_secret(reference).await? {
                Some(material) => Some(material),
                None => {
                    let _ = credential.ct_eq(DUMMY_CREDENTIAL);
                    return Err(Rejection::SecretNotFound);
                }
            },
        };
        let credential_ok: bool = match &expected {
            Some(expected) => credential.ct_eq(expected).into(),
            None => true,
        };
        if record.disabled {
            return Err(Rejection::Disabled);
        }
        if !credential_ok {
            return Err(Rejection::BadCredential);
        }
        Ok(identity_of(record))
    }
}

fn identity_of(record: UserRecord) -> Identity {
    let permissions = record.permission_set();
    Identity {
        username: record.username,
        home: record.home,
        chroot: record.chroot,
        permissions,
        backend: record.backend,
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("control_plane", &self.control_plane)
            .field("failed_login_delay", &self.failed_login_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftpgate_core::{
        auth::{BackendBinding, BackendKind, Permissions},
        controlplane::{InMemoryControlPlane, LookupErrorKind, Permission, SecretRef},
        path::VirtualPath,
    };
    use async_trait::async_trait;
    use ftpgate_core::controlplane::BackendConfig;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    const DELAY: Duration = Duration::from_millis(40);

    fn record(username: &str, credential: Option<SecretValue>, permissions: Vec<Permission>) -> UserRecord {
        UserRecord {
            username: username.to_string(),
            disabled: false,
            home: VirtualPath::new(&format!("/home/{}", username)),
            chroot: true,
            permissions,
            credential,
            backend: BackendBinding::new(BackendKind::Filesystem, "local"),
        }
    }

    async fn resolver() -> Resolver {
        let cp = InMemoryControlPlane::new();
        cp.upsert_user(record("alice", Some(SecretValue::Inline("wonderland".into())), vec![Permission::Read, Permission::Write, Permission::Delete, Permission::List]))
            .await;
        cp.upsert_user(record("anonymous", None, vec![Permission::Read, Permission::List])).await;
        let bob_secret = SecretRef {
            name: "ftp-users".into(),
            key: "bob".into(),
            namespace: None,
        };
        cp.upsert_user(record("bob", Some(SecretValue::Ref(bob_secret.clone())), vec![Permission::Read])).await;
        cp.upsert_secret(&bob_secret, "builder").await;
        let carol_secret = SecretRef {
            name: "ftp-users".into(),
            key: "carol".into(),
            namespace: None,
        };
        cp.upsert_user(record("carol", Some(SecretValue::Ref(carol_secret)), vec![Permission::Read])).await;
        let mut dave = record("dave", Some(SecretValue::Inline("pw".into())), vec![Permission::Read]);
        dave.disabled = true;
        cp.upsert_user(dave).await;
        Resolver::new(Arc::new(cp), DELAY, slog::Logger::root(slog::Discard, slog::o!()))
    }

    #[tokio::test]
    async fn inline_credential() {
        let identity = resolver().await.resolve("alice", b"wonderland").await.unwrap();
        assert_eq!(identity.home.as_str(), "/home/alice");
        assert!(identity.chroot);
        assert_eq!(identity.permissions, Permissions::all());
    }

    #[tokio::test]
    async fn referenced_credential() {
        let identity = resolver().await.resolve("bob", b"builder").await.unwrap();
        assert_eq!(identity.permissions, Permissions::READ);
    }

    #[tokio::test]
    async fn anonymous_takes_any_password_and_keeps_its_permissions() {
        let identity = resolver().await.resolve("anonymous", b"guest@example.com").await.unwrap();
        assert_eq!(identity.permissions, Permissions::READ | Permissions::LIST);
        assert!(!identity.may(Permissions::WRITE));
    }

    #[tokio::test]
    async fn every_failure_looks_the_same() {
        let resolver = resolver().await;
        for (user, pass) in [
            ("alice", &b"wrong"[..]),
            ("mallory", b"wonderland"),
            ("carol", b"anything"),
            ("dave", b"pw"),
        ] {
            let started = Instant::now();
            assert_eq!(resolver.resolve(user, pass).await, Err(AuthenticationError), "{user}");
            assert!(started.elapsed() >= DELAY, "{user} was rejected without delay");
        }
    }

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait]
    impl ControlPlane for Unreachable {
        async fn lookup_user(&self, _: &str) -> Result<Option<UserRecord>, LookupError> {
            Err(LookupErrorKind::Unavailable.into())
        }
        async fn lookup_backend(&self, _: BackendKind, _: &str, _: Option<&str>) -> Result<Option<BackendConfig>, LookupError> {
            Err(LookupErrorKind::Unavailable.into())
        }
        async fn lookup_secret(&self, _: &SecretRef) -> Result<Option<Vec<u8>>, LookupError> {
            Err(LookupErrorKind::Unavailable.into())
        }
    }

    #[tokio::test]
    async fn unreachable_control_plane_is_an_auth_failure() {
        let resolver = Resolver::new(Arc::new(Unreachable), DELAY, slog::Logger::root(slog::Discard, slog::o!()));
        assert_eq!(resolver.resolve("alice", b"wonderland").await, Err(AuthenticationError));
    }
}
