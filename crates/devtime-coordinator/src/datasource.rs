//! Data source test and deploy flows.
//!
//! Both reveal the vaulted password for the call and, once the backend
//! accepts it, move a plain password into the vault and mask the file.

use devtime_core::{Entry, Result};
use tracing::info;

use crate::coordinator::Coordinator;
use crate::events::TreeEvent;

impl Coordinator {
    /// Check the data source of `entry`'s application against the backend.
    pub async fn test_data_source(&self, entry: &Entry) -> Result<()> {
        let app = self.application_of(entry)?;
        let _lease = self.lease_for(&app.path).await;

        let data_source = self.vault.load(self.store(), &app.path).await?;
        self.api.test_data_source(&data_source).await?;
        info!(app = %app.name, "data source test passed");

        self.vault
            .protect(self.store(), &app.path, &data_source)
            .await?;
        self.notify(TreeEvent::Changed {
            parent: app.path.clone(),
        });
        Ok(())
    }

    /// Deploy the data source of `entry`'s application.
    pub async fn deploy_data_source(&self, entry: &Entry) -> Result<()> {
        let app = self.application_of(entry)?;
        let uri = self.tree.uri_of(app)?;
        let _lease = self.lease_for(&app.path).await;

        let data_source = self.vault.load(self.store(), &app.path).await?;
        self.api.deploy_data_source(&uri, &data_source).await?;
        info!(app = %uri, "data source deployed");

        self.vault
            .protect(self.store(), &app.path, &data_source)
            .await?;
        self.notify(TreeEvent::Changed {
            parent: app.path.clone(),
        });
        Ok(())
    }

    /// Re-enter the password of `entry`'s application data source, e.g.
    /// after a `MissingSecret` failure.
    pub async fn store_password(&self, entry: &Entry, password: &str) -> Result<()> {
        let app = self.application_of(entry)?;
        let _lease = self.lease_for(&app.path).await;
        self.vault
            .store_password(self.store(), &app.path, password)
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Fixture, SECRET};
    use devtime_core::Error;
    use devtime_remote::{Call, Failure};
    use devtime_vault::MASK;

    const DESCRIPTOR: &str = "/ws/shop/src/datasource.json";

    #[tokio::test]
    async fn test_successful_test_masks_descriptor() {
        let fx = Fixture::new();
        let shop = fx.entry("/ws/shop").await;

        fx.coordinator.test_data_source(&shop).await.unwrap();

        let text = fx.store.file_text(DESCRIPTOR).unwrap();
        assert!(!text.contains(SECRET));
        assert!(text.contains(MASK));
        assert_eq!(
            fx.api.calls(),
            vec![Call::TestDataSource {
                password: SECRET.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_test_keeps_plain_password() {
        let fx = Fixture::new();
        fx.api.fail(
            Call::TestDataSource {
                password: SECRET.to_string(),
            },
            Failure::Connectivity,
        );
        let shop = fx.entry("/ws/shop").await;

        let err = fx.coordinator.test_data_source(&shop).await.unwrap_err();

        assert!(matches!(err, Error::Connectivity(_)));
        assert!(fx.store.file_text(DESCRIPTOR).unwrap().contains(SECRET));
    }

    #[tokio::test]
    async fn test_deploy_uses_vaulted_secret_exactly() {
        let fx = Fixture::new();
        fx.vault_password().await;
        let module = fx.entry("/ws/shop/src/orders").await;

        fx.coordinator.deploy_data_source(&module).await.unwrap();

        assert_eq!(
            fx.api.calls(),
            vec![Call::DeployDataSource {
                app: "ws/shop".to_string(),
                password: SECRET.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_masked_without_secret_needs_reentry() {
        let fx = Fixture::new();
        fx.vault_password().await;
        fx.secrets_clear().await;
        let shop = fx.entry("/ws/shop").await;

        let err = fx.coordinator.deploy_data_source(&shop).await.unwrap_err();
        assert!(matches!(err, Error::MissingSecret(_)));
        assert!(fx.api.calls().is_empty());

        fx.coordinator
            .store_password(&shop, "new pass")
            .await
            .unwrap();
        fx.coordinator.deploy_data_source(&shop).await.unwrap();
        assert!(fx.store.file_text(DESCRIPTOR).unwrap().contains(MASK));
    }
}
