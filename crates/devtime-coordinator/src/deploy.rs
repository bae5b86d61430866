use devtime_core::remote::DeployOutcome;
use devtime_core::{Entry, RenameStage, Result};
use tracing::info;

use crate::coordinator::Coordinator;

impl Coordinator {
    /// Deploy the application, module or service `entry` belongs to.
    /// Deploying an identity again replaces its previous deployment.
    pub async fn deploy(&self, entry: &Entry) -> Result<DeployOutcome> {
        let (deployable, uri) = self.deployable(entry)?;
        let _lease = self.lease_for(&deployable.path).await;
        self.deploy_dir(&deployable.path, &uri).await
    }

    pub async fn undeploy(&self, entry: &Entry) -> Result<()> {
        let (deployable, uri) = self.deployable(entry)?;
        let _lease = self.lease_for(&deployable.path).await;
        self.undeploy_uri(&uri).await
    }

    /// Undeploy then deploy the same identity, e.g. after the backend
    /// regenerated part of a service.
    pub async fn redeploy(&self, entry: &Entry) -> Result<DeployOutcome> {
        let (deployable, uri) = self.deployable(entry)?;
        let _lease = self.lease_for(&deployable.path).await;
        info!(uri = %uri, "redeploy started");

        self.undeploy_uri(&uri)
            .await
            .map_err(|e| e.at_stage(RenameStage::Undeploying))?;
        self.deploy_dir(&deployable.path, &uri)
            .await
            .map_err(|e| e.at_stage(RenameStage::Redeploying))
    }
}
