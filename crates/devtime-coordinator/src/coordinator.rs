use devtime_core::remote::{DeployOutcome, DeploymentApi, Packager};
use devtime_core::store::DescriptorStore;
use devtime_core::{Entry, Error, ResourceUri, Result};
use devtime_tree::{ProjectLayout, ResourceTree};
use devtime_vault::CredentialVault;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::events::TreeEvent;
use crate::lease::{Lease, Leases};

const EVENT_CAPACITY: usize = 64;

/// Runs multi-step operations across the local tree and the backend.
///
/// Steps are not transactional. A failed cascade stops where it failed and
/// reports the stage; completed steps stay done.
pub struct Coordinator {
    pub(crate) tree: ResourceTree,
    pub(crate) api: Arc<dyn DeploymentApi>,
    pub(crate) packager: Arc<dyn Packager>,
    pub(crate) vault: CredentialVault,
    leases: Leases,
    events: broadcast::Sender<TreeEvent>,
}

impl Coordinator {
    pub fn new(
        tree: ResourceTree,
        api: Arc<dyn DeploymentApi>,
        packager: Arc<dyn Packager>,
        vault: CredentialVault,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tree,
            api,
            packager,
            vault,
            leases: Leases::new(),
            events,
        }
    }

    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    pub fn layout(&self) -> &ProjectLayout {
        self.tree.layout()
    }

    pub(crate) fn store(&self) -> &dyn DescriptorStore {
        self.tree.store().as_ref()
    }

    /// Tree change notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: TreeEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Lease of the application `path` belongs to.
    pub(crate) async fn lease_for(&self, path: &Path) -> Lease {
        let app_dir = self.application_dir_of(path);
        self.leases.acquire(&app_dir).await
    }

    /// `<root>/<app>` for any path inside an application.
    pub(crate) fn application_dir_of(&self, path: &Path) -> PathBuf {
        let root = self.layout().root();
        match path.strip_prefix(root).ok().and_then(|r| r.components().next()) {
            Some(first) => root.join(first),
            None => path.to_path_buf(),
        }
    }

    /// Nearest deployable entry and its remote identity.
    pub(crate) fn deployable<'a>(&self, entry: &'a Entry) -> Result<(&'a Entry, ResourceUri)> {
        let deployable = entry.deployable().ok_or_else(|| {
            Error::InvalidInput(format!(
                "{} is not part of an application, module or service",
                entry.path.display()
            ))
        })?;
        let uri = self.tree.uri_of(deployable)?;
        Ok((deployable, uri))
    }

    pub(crate) fn application_of<'a>(&self, entry: &'a Entry) -> Result<&'a Entry> {
        entry.application().ok_or_else(|| {
            Error::InvalidInput(format!(
                "{} is not inside an application",
                entry.path.display()
            ))
        })
    }

    /// Undeploy, treating an identity the backend does not know as already
    /// undeployed.
    pub(crate) async fn undeploy_uri(&self, uri: &ResourceUri) -> Result<()> {
        match self.api.undeploy(uri).await {
            Err(e) if e.is_not_found() => {
                warn!(uri = %uri, "not deployed, nothing to undeploy");
                Ok(())
            }
            Err(e) => Err(e),
            Ok(()) => {
                info!(uri = %uri, "undeployed");
                Ok(())
            }
        }
    }

    /// Package the subtree at `dir` and deploy it as `uri`.
    pub(crate) async fn deploy_dir(&self, dir: &Path, uri: &ResourceUri) -> Result<DeployOutcome> {
        let archive = self.packager.package(dir).await?;
        let outcome = self.api.deploy(uri, archive).await?;
        for service in outcome.invalid_services() {
            warn!(
                service = %service.uri,
                reason = service.reason.as_deref().unwrap_or(""),
                "backend marked service invalid"
            );
        }
        info!(uri = %uri, services = outcome.services.len(), "deployed");
        Ok(outcome)
    }
}
