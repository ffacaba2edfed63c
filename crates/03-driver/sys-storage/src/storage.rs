use tracing::{debug, info};

use crate::backend::KvBackend;
use crate::config::SysConfig;
use crate::error::{StorageError, StorageResult};

/// Namespace holding the system config.
pub const NAMESPACE: &str = "storage";
/// Key of the system config within [`NAMESPACE`].
pub const CONFIG_KEY: &str = "sys_cfg";

/// Saves and loads the [`SysConfig`] record through a [`KvBackend`].
pub struct SysStorage<B> {
    backend: B,
}

impl<B: KvBackend> SysStorage<B> {
    /// Wraps `backend`.
    pub fn new(backend: B) -> Self {
        debug!(namespace = NAMESPACE, "config storage ready");
        Self { backend }
    }

    /// Backend in use.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Persists `config`, replacing any previous record.
    pub fn save(&self, config: &SysConfig) -> StorageResult<()> {
        self.backend
            .set(NAMESPACE, CONFIG_KEY, &config.to_bytes())?;
        info!(
            magic = format_args!("{:#010x}", config.magic_id),
            version = config.config_ver,
            "config saved"
        );
        Ok(())
    }

    /// Reads the stored record.
    pub fn load(&self) -> StorageResult<SysConfig> {
        let bytes = self
            .backend
            .get(NAMESPACE, CONFIG_KEY)?
            .ok_or_else(|| StorageError::NotFound {
                namespace: NAMESPACE.to_owned(),
                key: CONFIG_KEY.to_owned(),
            })?;
        let config = SysConfig::from_bytes(&bytes)?;
        info!(
            magic = format_args!("{:#010x}", config.magic_id),
            version = config.config_ver,
            "config loaded"
        );
        Ok(config)
    }

    /// Reads the stored record, falling back to [`SysConfig::default`] when
    /// none was saved. Corrupt records are still errors.
    pub fn load_or_default(&self) -> StorageResult<SysConfig> {
        match self.load() {
            Err(StorageError::NotFound { .. }) => Ok(SysConfig::default()),
            other => other,
        }
    }

    /// Forgets the stored record.
    pub fn erase(&self) -> StorageResult<bool> {
        self.backend.remove(NAMESPACE, CONFIG_KEY)
    }
}
