use devtime_core::descriptor::DataSource;
use devtime_core::secret::SecretStore;
use devtime_core::store::{read_json, update_field, DescriptorStore};
use devtime_core::{Error, Result};
use devtime_tree::ProjectLayout;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Placeholder written to `datasource.json` once the password is vaulted.
pub const MASK: &str = "<vaulted>";

const KEY_PREFIX: &str = "datasource:";
const PASSWORD_FIELD: &str = "password";

/// Masks persisted passwords and keeps the real ones in a secret store.
#[derive(Clone)]
pub struct CredentialVault {
    secrets: Arc<dyn SecretStore>,
    layout: ProjectLayout,
}

impl CredentialVault {
    pub fn new(secrets: Arc<dyn SecretStore>, layout: ProjectLayout) -> Self {
        Self { secrets, layout }
    }

    pub fn is_masked(password: &str) -> bool {
        password == MASK
    }

    /// Identity key of the data source of the application at `app_dir`.
    ///
    /// Derived from the descriptor path, never from display names, so a
    /// moved application gets a new key.
    pub fn identity_key(&self, app_dir: &Path) -> Result<String> {
        let descriptor = ProjectLayout::data_source_descriptor(app_dir);
        let relative = self.layout.relative(&descriptor)?;
        Ok(format!(
            "{}{}/{}",
            KEY_PREFIX,
            self.layout.workspace(),
            relative
        ))
    }

    pub async fn store(&self, key: &str, secret: &str) -> Result<()> {
        debug!(key, "storing secret");
        self.secrets.set(key, secret).await
    }

    pub async fn retrieve(&self, key: &str) -> Result<Option<String>> {
        self.secrets.get(key).await
    }

    /// Load `datasource.json` with its real password filled in.
    ///
    /// Fails with [`Error::MissingSecret`] when the descriptor is masked and
    /// the vault has nothing under its key.
    pub async fn load(&self, store: &dyn DescriptorStore, app_dir: &Path) -> Result<DataSource> {
        let path = ProjectLayout::data_source_descriptor(app_dir);
        let data_source: DataSource = read_json(store, &path).await?;
        self.reveal(app_dir, data_source).await
    }

    /// Replace a masked password with the vaulted secret.
    pub async fn reveal(&self, app_dir: &Path, mut data_source: DataSource) -> Result<DataSource> {
        if !Self::is_masked(&data_source.password) {
            return Ok(data_source);
        }
        let key = self.identity_key(app_dir)?;
        match self.retrieve(&key).await? {
            Some(secret) => {
                data_source.password = secret;
                Ok(data_source)
            }
            None => Err(Error::MissingSecret(key)),
        }
    }

    /// Vault the real password of a successfully used data source and write
    /// the mask in its place. Already-masked descriptors are left alone.
    pub async fn protect(
        &self,
        store: &dyn DescriptorStore,
        app_dir: &Path,
        data_source: &DataSource,
    ) -> Result<()> {
        if Self::is_masked(&data_source.password) {
            return Ok(());
        }
        let key = self.identity_key(app_dir)?;
        self.store(&key, &data_source.password).await?;

        let path = ProjectLayout::data_source_descriptor(app_dir);
        update_field(store, &path, PASSWORD_FIELD, MASK).await?;
        info!(key = %key, "password vaulted");
        Ok(())
    }

    /// Put a re-entered password back into `datasource.json`; the next
    /// successful use vaults it again.
    pub async fn store_password(
        &self,
        store: &dyn DescriptorStore,
        app_dir: &Path,
        password: &str,
    ) -> Result<()> {
        if Self::is_masked(password) {
            return Err(Error::InvalidInput(
                "the password cannot be the vault mask".to_string(),
            ));
        }
        let path = ProjectLayout::data_source_descriptor(app_dir);
        update_field(store, &path, PASSWORD_FIELD, password).await
    }

    /// Copy the secret of a moved application to its new key.
    ///
    /// The old key is left in place. Returns whether anything was copied.
    pub async fn migrate(&self, old_app_dir: &Path, new_app_dir: &Path) -> Result<bool> {
        let old_key = self.identity_key(old_app_dir)?;
        let new_key = self.identity_key(new_app_dir)?;
        match self.retrieve(&old_key).await? {
            Some(secret) => {
                self.store(&new_key, &secret).await?;
                info!(from = %old_key, to = %new_key, "secret migrated, old key kept");
                Ok(true)
            }
            None => {
                debug!(key = %old_key, "no secret to migrate");
                Ok(false)
            }
        }
    }
}
