//! Rename cascade.
//!
//! `Validating -> Moving -> UpdatingDescriptor -> SecretMigration (apps only)
//! -> Undeploying -> Redeploying -> Done`. Validation failures come back
//! as-is since nothing has changed yet; later failures are wrapped with the
//! stage that failed and nothing is rolled back.

use devtime_core::remote::DeployOutcome;
use devtime_core::store::update_name;
use devtime_core::{Entry, EntryType, Error, RenameStage, ResourceUri, Result};
use devtime_tree::layout::descriptor_in;
use std::path::PathBuf;
use tracing::info;

use crate::coordinator::Coordinator;
use crate::events::TreeEvent;
use crate::names::validate_name;

/// What a completed rename did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub from: ResourceUri,
    pub to: ResourceUri,
    pub path: PathBuf,
    pub secret_migrated: bool,
    /// The redeploy result; invalid services are reported here, not raised.
    pub deploy: DeployOutcome,
}

/// A validated rename, ready to run.
struct RenamePlan {
    entry_type: EntryType,
    source: PathBuf,
    target: PathBuf,
    descriptor: PathBuf,
    from: ResourceUri,
    to: ResourceUri,
}

impl Coordinator {
    /// Rename an application, module or service and redeploy it under its
    /// new identity.
    pub async fn rename(&self, entry: &Entry, new_name: &str) -> Result<RenameOutcome> {
        let _lease = self.lease_for(&entry.path).await;
        let plan = self.plan_rename(entry, new_name).await?;
        info!(from = %plan.from, to = %plan.to, "rename started");

        let stage = RenameStage::Moving;
        self.store()
            .rename(&plan.source, &plan.target)
            .await
            .map_err(|e| e.at_stage(stage))?;
        info!(%stage, path = %plan.target.display(), "moved");
        self.notify(TreeEvent::Renamed {
            from: plan.source.clone(),
            to: plan.target.clone(),
        });

        let stage = RenameStage::UpdatingDescriptor;
        update_name(self.store(), &plan.descriptor, new_name)
            .await
            .map_err(|e| e.at_stage(stage))?;
        info!(%stage, descriptor = %plan.descriptor.display(), "descriptor renamed");

        let mut secret_migrated = false;
        if plan.entry_type == EntryType::Application {
            let stage = RenameStage::SecretMigration;
            secret_migrated = self
                .vault
                .migrate(&plan.source, &plan.target)
                .await
                .map_err(|e| e.at_stage(stage))?;
        }

        let stage = RenameStage::Undeploying;
        self.undeploy_uri(&plan.from)
            .await
            .map_err(|e| e.at_stage(stage))?;

        let stage = RenameStage::Redeploying;
        let deploy = self
            .deploy_dir(&plan.target, &plan.to)
            .await
            .map_err(|e| e.at_stage(stage))?;

        info!(stage = %RenameStage::Done, from = %plan.from, to = %plan.to, "rename finished");
        if let Some(parent) = plan.target.parent() {
            self.notify(TreeEvent::Changed {
                parent: parent.to_path_buf(),
            });
        }
        Ok(RenameOutcome {
            from: plan.from,
            to: plan.to,
            path: plan.target,
            secret_migrated,
            deploy,
        })
    }

    /// Everything a rename needs, checked before the first mutation.
    async fn plan_rename(&self, entry: &Entry, new_name: &str) -> Result<RenamePlan> {
        if !entry.entry_type.is_deployable() {
            return Err(Error::InvalidInput(format!(
                "only applications, modules and services can be renamed, not {}",
                entry.entry_type
            )));
        }
        validate_name(new_name)?;

        let source = entry.path.clone();
        let target = match source.parent() {
            Some(parent) => parent.join(new_name),
            None => self.layout().root().join(new_name),
        };
        if self.store().exists(&target).await? {
            return Err(Error::NameCollision(target));
        }

        let descriptor = descriptor_in(entry.entry_type, &target).ok_or_else(|| {
            Error::Internal(format!("no descriptor for {}", entry.entry_type))
        })?;
        let from = self.tree.uri_of(entry)?;
        let to = self.layout().resource_uri(&target)?;
        Ok(RenamePlan {
            entry_type: entry.entry_type,
            source,
            target,
            descriptor,
            from,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Fixture, SECRET};
    use devtime_core::secret::SecretStore;
    use devtime_core::store::DescriptorStore;
    use devtime_core::{Error, RenameStage};
    use devtime_remote::{Call, Failure};
    use devtime_vault::MASK;
    use std::path::Path;

    use crate::events::TreeEvent;

    #[tokio::test]
    async fn test_collision_changes_nothing() {
        let fx = Fixture::new();
        fx.add_application("blog");
        let before = fx.store.snapshot();
        let secrets_before = fx.secrets.list("").await.unwrap();

        let shop = fx.entry("/ws/shop").await;
        let err = fx.coordinator.rename(&shop, "blog").await.unwrap_err();

        assert!(matches!(err, Error::NameCollision(ref p) if p == Path::new("/ws/blog")));
        assert_eq!(fx.store.snapshot(), before);
        assert_eq!(fx.secrets.list("").await.unwrap(), secrets_before);
        assert!(fx.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_service_rename_cascade_order() {
        let fx = Fixture::new();
        let list = fx.entry("/ws/shop/src/orders/list").await;

        let outcome = fx.coordinator.rename(&list, "search").await.unwrap();

        assert_eq!(outcome.to.to_string(), "ws/shop/orders/search");
        assert_eq!(
            fx.api.calls(),
            vec![
                Call::Undeploy("ws/shop/orders/list".to_string()),
                Call::Deploy("ws/shop/orders/search".to_string()),
            ]
        );
        assert!(!fx.store.exists(Path::new("/ws/shop/src/orders/list")).await.unwrap());

        let descriptor: serde_json::Value = serde_json::from_str(
            &fx.store
                .file_text("/ws/shop/src/orders/search/service.json")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(descriptor["name"], "search");
        assert_eq!(descriptor["type"], "query");

        let archive = fx.api.archive("ws/shop/orders/search").unwrap();
        assert!(String::from_utf8_lossy(&archive).contains("search/query.sql"));
    }

    #[tokio::test]
    async fn test_application_rename_migrates_secret() {
        let fx = Fixture::new();
        fx.vault_password().await;
        let shop = fx.entry("/ws/shop").await;

        let outcome = fx.coordinator.rename(&shop, "outlet").await.unwrap();

        assert!(outcome.secret_migrated);
        let keys = fx.secrets.list("datasource:").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "datasource:ws/outlet/src/datasource.json",
                "datasource:ws/shop/src/datasource.json",
            ]
        );
        let text = fx
            .store
            .file_text("/ws/outlet/src/datasource.json")
            .unwrap();
        assert!(text.contains(MASK));

        let outlet = fx.entry("/ws/outlet").await;
        let revealed = fx
            .coordinator
            .vault
            .load(fx.coordinator.store(), &outlet.path)
            .await
            .unwrap();
        assert_eq!(revealed.password, SECRET);
    }

    #[tokio::test]
    async fn test_not_deployed_old_identity_is_tolerated() {
        let fx = Fixture::new();
        let module = fx.entry("/ws/shop/src/orders").await;

        fx.coordinator.rename(&module, "sales").await.unwrap();

        assert!(fx.api.is_deployed("ws/shop/sales"));
        assert!(!fx.api.is_deployed("ws/shop/orders"));
    }

    #[tokio::test]
    async fn test_target_taken_during_move_reports_moving() {
        let fx = Fixture::new();
        let list = fx.entry("/ws/shop/src/orders/list").await;
        fx.store.occupy_on_rename("/ws/shop/src/orders/search");

        let err = fx.coordinator.rename(&list, "search").await.unwrap_err();

        match &err {
            Error::Cascade { stage, source } => {
                assert_eq!(*stage, RenameStage::Moving);
                assert!(matches!(
                    **source,
                    Error::MoveConflict(ref p) if p == Path::new("/ws/shop/src/orders/search")
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(fx
            .store
            .file_text("/ws/shop/src/orders/list/service.json")
            .is_some());
        assert!(fx.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_descriptor_reports_updating_and_keeps_move() {
        let fx = Fixture::new();
        let list = fx.entry("/ws/shop/src/orders/list").await;
        fx.store
            .insert_file("/ws/shop/src/orders/list/service.json", r#"{"name": "list""#);

        let err = fx.coordinator.rename(&list, "search").await.unwrap_err();

        match &err {
            Error::Cascade { stage, source } => {
                assert_eq!(*stage, RenameStage::UpdatingDescriptor);
                assert!(matches!(**source, Error::Serialization { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!fx.store.exists(Path::new("/ws/shop/src/orders/list")).await.unwrap());
        assert_eq!(
            fx.store
                .file_text("/ws/shop/src/orders/search/service.json")
                .as_deref(),
            Some(r#"{"name": "list""#)
        );
        assert!(fx
            .store
            .file_text("/ws/shop/src/orders/search/query.sql")
            .is_some());
        assert!(fx.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_redeploy_reports_stage_and_keeps_move() {
        let fx = Fixture::new();
        fx.api.fail(
            Call::Deploy("ws/shop/orders/search".to_string()),
            Failure::Timeout,
        );
        let list = fx.entry("/ws/shop/src/orders/list").await;

        let err = fx.coordinator.rename(&list, "search").await.unwrap_err();

        match &err {
            Error::Cascade { stage, source } => {
                assert_eq!(*stage, RenameStage::Redeploying);
                assert!(matches!(**source, Error::Timeout(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(fx
            .store
            .exists(Path::new("/ws/shop/src/orders/search/service.json"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_invalid_name_is_rejected_before_move() {
        let fx = Fixture::new();
        let before = fx.store.snapshot();
        let list = fx.entry("/ws/shop/src/orders/list").await;

        let err = fx.coordinator.rename(&list, "../escape").await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(fx.store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_rename_notifies_tree() {
        let fx = Fixture::new();
        let mut events = fx.coordinator.subscribe();
        let list = fx.entry("/ws/shop/src/orders/list").await;

        fx.coordinator.rename(&list, "search").await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            TreeEvent::Renamed {
                from: "/ws/shop/src/orders/list".into(),
                to: "/ws/shop/src/orders/search".into(),
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            TreeEvent::Changed {
                parent: "/ws/shop/src/orders".into(),
            }
        );
    }
}
