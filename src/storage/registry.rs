use super::{Error, ErrorKind, Result, StorageBackend};
use dashmap::DashMap;
use ftpgate_core::{
    auth::BackendBinding,
    controlplane::{BackendConfig, ControlPlane, SecretValue},
};
use ftpgate_sbe_fs::Filesystem;
use ftpgate_sbe_opendal::{OpendalBackend, S3Options, WebdavOptions};
use std::{fmt, sync::Arc};

/// Builds [`StorageBackend`]s from the backend records of a [`ControlPlane`] and caches them per
/// [`BackendBinding`].
///
/// Every call looks the binding up again. The cached adapter is reused only while the record is
/// unchanged, so an edited record gets a fresh adapter on the next login. Sessions that already
/// hold the old one keep using it until they disconnect.
pub struct BackendRegistry {
    control_plane: Arc<dyn ControlPlane>,
    cache: DashMap<BackendBinding, CachedBackend>,
    logger: slog::Logger,
}

#[derive(Clone)]
struct CachedBackend {
    config: BackendConfig,
    backend: Arc<dyn StorageBackend>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new(control_plane: Arc<dyn ControlPlane>, logger: slog::Logger) -> Self {
        BackendRegistry {
            control_plane,
            cache: DashMap::new(),
            logger,
        }
    }

    /// Returns the adapter for `binding`, building it if needed. Fails with
    /// [`ErrorKind::BackendUnavailable`] if the binding is not declared, declares a different kind
    /// than the binding names, or the adapter cannot be built.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn get(&self, binding: &BackendBinding) -> Result<Arc<dyn StorageBackend>> {
        let config = self
            .control_plane
            .lookup_backend(binding.kind, &binding.name, binding.namespace.as_deref())
            .await
            .map_err(unavailable)?;
        let config = match config {
            Some(config) if config.kind() == binding.kind => config,
            Some(config) => {
                slog::warn!(self.logger, "Backend {} is declared as {}", binding, config.kind());
                return Err(ErrorKind::BackendUnavailable.into());
            }
            None => {
                if self.cache.remove(binding).is_some() {
                    slog::info!(self.logger, "Backend {} was removed, dropping cached adapter", binding);
                }
                return Err(ErrorKind::BackendUnavailable.into());
            }
        };

        if let Some(cached) = self.cache.get(binding) {
            if cached.config == config {
                return Ok(Arc::clone(&cached.backend));
            }
        }

        slog::info!(self.logger, "Building storage backend {}", binding);
        let backend = self.build(&config).await.map_err(|e| {
            slog::warn!(self.logger, "Could not build storage backend {}: {}", binding, e);
            e
        })?;
        self.cache.insert(
            binding.clone(),
            CachedBackend {
                config,
                backend: Arc::clone(&backend),
            },
        );
        Ok(backend)
    }

    async fn build(&self, config: &BackendConfig) -> Result<Arc<dyn StorageBackend>> {
        match config {
            BackendConfig::Filesystem { root } => {
                let fs = Filesystem::new(root).map_err(unavailable)?;
                Ok(Arc::new(fs))
            }
            BackendConfig::ObjectStore {
                endpoint,
                region,
                bucket,
                root,
                access_key_id,
                secret_access_key,
            } => {
                let secret_access_key = self.secret(secret_access_key).await?;
                let backend = OpendalBackend::s3(&S3Options {
                    endpoint,
                    region: region.as_deref().unwrap_or_default(),
                    bucket,
                    root: root.as_deref().unwrap_or_default(),
                    access_key_id,
                    secret_access_key: &secret_access_key,
                })
                .map_err(unavailable)?;
                Ok(Arc::new(backend))
            }
            BackendConfig::Webdav {
                endpoint,
                username,
                password,
                root,
            } => {
                let password = match password {
                    Some(password) => Some(self.secret(password).await?),
                    None => None,
                };
                let backend = OpendalBackend::webdav(&WebdavOptions {
                    endpoint,
                    username: username.as_deref(),
                    password: password.as_deref(),
                    root: root.as_deref().unwrap_or_default(),
                })
                .map_err(unavailable)?;
                Ok(Arc::new(backend))
            }
        }
    }

    async fn secret(&self, value: &SecretValue) -> Result<String> {
        match value {
            SecretValue::Inline(value) => Ok(value.clone()),
            SecretValue::Ref(reference) => {
                let material = self
                    .control_plane
                    .lookup_secret(reference)
                    .await
                    .map_err(unavailable)?
                    .ok_or(ErrorKind::BackendUnavailable)?;
                String::from_utf8(material).map_err(unavailable)
            }
        }
    }
}

fn unavailable<E>(error: E) -> Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    Error::new(ErrorKind::BackendUnavailable, error)
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("control_plane", &self.control_plane)
            .field("cached", &self.cache.len())
            .finish()
    }
}
