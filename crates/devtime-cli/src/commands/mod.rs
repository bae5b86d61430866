//! CLI command implementations.

pub mod deploy;
pub mod mirror;
pub mod project;

use anyhow::{Context, Result};
use devtime_config::{SETTINGS_FILE, Settings, load_settings};
use devtime_coordinator::Coordinator;
use devtime_core::remote::DeploymentApi;
use devtime_core::secret::{SESSION_TOKEN_KEY, SecretStore};
use devtime_core::store::DescriptorStore;
use devtime_core::{Entry, ResourceUri};
use devtime_mirror::Synchronizer;
use devtime_remote::HttpDeploymentApi;
use devtime_store::{FileSecretStore, LocalStore, ZipPackager};
use devtime_tree::{ProjectLayout, ResourceTree};
use devtime_vault::CredentialVault;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Everything a command needs, wired once per invocation.
pub struct Project {
    root: PathBuf,
    settings: Settings,
    secrets: Arc<FileSecretStore>,
    pub coordinator: Coordinator,
    pub synchronizer: Synchronizer,
}

impl Project {
    pub async fn open(root: &Path, endpoint: Option<&str>, token: Option<String>) -> Result<Self> {
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("Failed to resolve workspace root: {}", root.display()))?;
        let settings_path = root.join(SETTINGS_FILE);
        let mut settings = load_settings(&settings_path)
            .with_context(|| format!("Failed to load settings: {}", settings_path.display()))?;
        if let Some(endpoint) = endpoint {
            settings.endpoint = Url::parse(endpoint)
                .with_context(|| format!("Invalid endpoint URL: {}", endpoint))?;
        }

        let vault_path = settings.vault_path(&root);
        let secrets = Arc::new(
            FileSecretStore::open(&vault_path)
                .await
                .with_context(|| format!("Failed to open secret store: {}", vault_path.display()))?,
        );
        let token = match token {
            Some(token) => Some(token),
            None => secrets.get(SESSION_TOKEN_KEY).await?,
        };
        debug!(
            workspace = %settings.workspace,
            endpoint = %settings.endpoint,
            authenticated = token.is_some(),
            "project opened"
        );

        let layout = ProjectLayout::new(&root, settings.workspace.clone());
        let store: Arc<dyn DescriptorStore> = Arc::new(LocalStore::new());
        let api: Arc<dyn DeploymentApi> = Arc::new(HttpDeploymentApi::new(&settings, token));

        let tree = ResourceTree::new(store.clone(), layout.clone());
        let vault = CredentialVault::new(secrets.clone(), layout.clone());
        let coordinator = Coordinator::new(tree, api.clone(), Arc::new(ZipPackager::new()), vault);
        let synchronizer =
            Synchronizer::new(api, store, &layout, settings.service_endpoint.as_str());

        Ok(Self {
            root,
            settings,
            secrets,
            coordinator,
            synchronizer,
        })
    }

    /// Close the secret store once nothing else holds it.
    pub async fn close(self) -> Result<()> {
        let Self {
            secrets,
            coordinator,
            synchronizer,
            ..
        } = self;
        drop(coordinator);
        drop(synchronizer);
        match Arc::try_unwrap(secrets) {
            Ok(secrets) => secrets.close().await.context("Failed to close secret store")?,
            Err(_) => debug!("secret store still shared, left open"),
        }
        Ok(())
    }

    /// Entry at a path given on the command line, relative to the root.
    pub async fn entry(&self, path: &Path) -> Result<Entry> {
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        self.coordinator
            .tree()
            .find(&full)
            .await
            .with_context(|| format!("No resource at {}", path.display()))
    }

    pub fn application_uri(&self, name: &str) -> ResourceUri {
        ResourceUri::application(self.settings.workspace.clone(), name)
    }

    /// Identity given without its workspace segment, e.g. `shop/orders/list`.
    pub fn resource_uri(&self, relative: &str) -> Result<ResourceUri> {
        let full = format!("{}/{}", self.settings.workspace, relative.trim_matches('/'));
        full.parse::<ResourceUri>()
            .with_context(|| format!("Invalid resource identity: {}", relative))
    }
}

pub async fn login(project: &Project, token: &str) -> Result<()> {
    project
        .secrets
        .set(SESSION_TOKEN_KEY, token)
        .await
        .context("Failed to store session token")?;
    println!(
        "Session token stored for workspace {}",
        project.settings.workspace
    );
    Ok(())
}
