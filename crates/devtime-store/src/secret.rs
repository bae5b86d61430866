//! Secret store backends.

use async_trait::async_trait;
use devtime_core::secret::SecretStore;
use devtime_core::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Secret store persisted as a JSON map in a single file.
///
/// Opened once per process for the active workspace; every mutation is
/// written through, so closing only has to drop the handle.
pub struct FileSecretStore {
    path: PathBuf,
    secrets: tokio::sync::Mutex<BTreeMap<String, String>>,
}

impl FileSecretStore {
    /// Open the store, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let secrets = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| Error::Serialization {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::io(&path, e)),
        };
        debug!(path = %path.display(), "opened secret store");
        Ok(Self {
            path,
            secrets: tokio::sync::Mutex::new(secrets),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, secrets: &BTreeMap<String, String>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(secrets).map_err(|source| Error::Serialization {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| Error::io(&self.path, e))
    }

    /// Close the store.
    pub async fn close(self) -> Result<()> {
        let secrets = self.secrets.lock().await;
        self.persist(&secrets).await
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.secrets.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut secrets = self.secrets.lock().await;
        secrets.insert(key.to_string(), value.to_string());
        self.persist(&secrets).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut secrets = self.secrets.lock().await;
        if secrets.remove(key).is_some() {
            self.persist(&secrets).await?;
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .secrets
            .lock()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Secret store that lives only as long as the process.
#[derive(Clone, Default)]
pub struct MemorySecretStore {
    secrets: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.secrets.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
