//! Shared fixture: one workspace `ws` with an application `shop`, a module
//! `orders`, a query service `list` and a crud service `edit`.

use async_trait::async_trait;
use bytes::Bytes;
use devtime_core::remote::Packager;
use devtime_core::secret::SecretStore;
use devtime_core::store::DescriptorStore;
use devtime_core::{Entry, Result};
use devtime_remote::MemoryDeploymentApi;
use devtime_store::{MemorySecretStore, MemoryStore};
use devtime_tree::{ProjectLayout, ResourceTree};
use devtime_vault::CredentialVault;
use std::path::Path;
use std::sync::Arc;

use crate::coordinator::Coordinator;

pub const SECRET: &str = "s3cr3t pa55";

/// Packs a subtree as a newline separated list of file names, relative to
/// the parent of the packed folder.
struct ListingPackager {
    store: MemoryStore,
}

#[async_trait]
impl Packager for ListingPackager {
    async fn package(&self, root: &Path) -> Result<Bytes> {
        let base = root.parent().unwrap_or(root);
        let mut names = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for child in self.store.read_dir(&dir).await? {
                if self.store.is_dir(&child.path).await? {
                    pending.push(child.path);
                } else {
                    let relative = child.path.strip_prefix(base).unwrap();
                    names.push(relative.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(Bytes::from(names.join("\n")))
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub secrets: MemorySecretStore,
    pub api: MemoryDeploymentApi,
    pub coordinator: Coordinator,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        store.insert_file("/ws/devtime.kdl", "workspace \"ws\"\n");
        store.insert_file(
            "/ws/shop/src/application.json",
            r#"{"name":"shop"}"#,
        );
        store.insert_file(
            "/ws/shop/src/datasource.json",
            format!(
                r#"{{"dbType":"postgres","host":"db","port":5432,"database":"shop","username":"app","password":"{}"}}"#,
                SECRET
            ),
        );
        store.insert_file("/ws/shop/src/orders/module.json", r#"{"name":"orders"}"#);

        let list = "/ws/shop/src/orders/list";
        store.insert_file(
            format!("{list}/service.json"),
            r#"{"name":"list","type":"query"}"#,
        );
        store.insert_file(format!("{list}/input.json"), "{}");
        store.insert_file(format!("{list}/output.json"), "{}");
        store.insert_file(format!("{list}/query.sql"), "select * from orders");
        store.insert_dir(format!("{list}/tests"));

        let edit = "/ws/shop/src/orders/edit";
        store.insert_file(
            format!("{edit}/service.json"),
            r#"{"name":"edit","type":"crud"}"#,
        );
        store.insert_file(format!("{edit}/object.json"), "{}");
        store.insert_file(format!("{edit}/read/query.sql"), "select * from orders");
        store.insert_file(format!("{edit}/write/tables.json"), r#"["orders"]"#);

        let secrets = MemorySecretStore::new();
        let api = MemoryDeploymentApi::new();
        let layout = ProjectLayout::new("/ws", "ws");
        let tree = ResourceTree::new(Arc::new(store.clone()), layout.clone());
        let vault = CredentialVault::new(Arc::new(secrets.clone()), layout);
        let packager = ListingPackager {
            store: store.clone(),
        };
        let coordinator = Coordinator::new(tree, Arc::new(api.clone()), Arc::new(packager), vault);

        Self {
            store,
            secrets,
            api,
            coordinator,
        }
    }

    pub fn add_application(&self, name: &str) {
        self.store.insert_file(
            format!("/ws/{name}/src/application.json"),
            format!(r#"{{"name":"{name}"}}"#),
        );
        self.store
            .insert_file(format!("/ws/{name}/src/datasource.json"), "{}");
    }

    pub async fn entry(&self, path: &str) -> Entry {
        self.coordinator.tree().find(Path::new(path)).await.unwrap()
    }

    /// Move the plain `shop` password into the vault and mask the file.
    pub async fn vault_password(&self) {
        let app = Path::new("/ws/shop");
        let data_source = self
            .coordinator
            .vault
            .load(self.coordinator.store(), app)
            .await
            .unwrap();
        self.coordinator
            .vault
            .protect(self.coordinator.store(), app, &data_source)
            .await
            .unwrap();
    }

    /// Forget every vaulted secret, as after a lost keychain.
    pub async fn secrets_clear(&self) {
        for key in self.secrets.list("").await.unwrap() {
            self.secrets.delete(&key).await.unwrap();
        }
    }
}
