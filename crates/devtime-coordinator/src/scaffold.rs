//! Create and delete resources in the local tree. Nothing here calls the
//! backend.

use devtime_core::descriptor::{Application, DataSource, Module, Service, ServiceType};
use devtime_core::store::write_json;
use devtime_core::{Entry, EntryType, Error, Result};
use devtime_tree::layout::{
    APPLICATION_FILE, DATASOURCE_FILE, INPUT_BINDINGS_FILE, INPUT_FILE, MODULE_FILE, OBJECT_FILE,
    OUTPUT_BINDINGS_FILE, OUTPUT_FILE, QUERY_FILE, READ_DIR, SERVICE_FILE, SQLS_FILE,
    TABLES_FILE, TESTS_DIR, WRITE_DIR,
};
use devtime_tree::ProjectLayout;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::coordinator::Coordinator;
use crate::events::TreeEvent;
use crate::names::validate_name;

const EMPTY_OBJECT: &str = "{}\n";
const EMPTY_LIST: &str = "[]\n";

/// Starter files of a query or sql service, relative to the service folder.
const QUERY_FILES: &[(&str, &str)] = &[
    (INPUT_FILE, EMPTY_OBJECT),
    (OUTPUT_FILE, EMPTY_OBJECT),
    (QUERY_FILE, ""),
    (INPUT_BINDINGS_FILE, EMPTY_LIST),
    (OUTPUT_BINDINGS_FILE, EMPTY_LIST),
];

fn starter_files(service_type: ServiceType) -> Result<Vec<(PathBuf, &'static str)>> {
    let files = match service_type {
        ServiceType::Query => QUERY_FILES
            .iter()
            .map(|(name, body)| (PathBuf::from(name), *body))
            .collect(),
        ServiceType::Sql => QUERY_FILES
            .iter()
            .map(|(name, body)| (PathBuf::from(name), *body))
            .chain([(PathBuf::from(SQLS_FILE), "")])
            .collect(),
        ServiceType::Crud => {
            let read = Path::new(READ_DIR);
            let write = Path::new(WRITE_DIR);
            vec![
                (PathBuf::from(OBJECT_FILE), EMPTY_OBJECT),
                (read.join(INPUT_FILE), EMPTY_OBJECT),
                (read.join(QUERY_FILE), ""),
                (read.join(INPUT_BINDINGS_FILE), EMPTY_LIST),
                (read.join(OUTPUT_BINDINGS_FILE), EMPTY_LIST),
                (write.join(TABLES_FILE), EMPTY_LIST),
            ]
        }
        ServiceType::Unknown => {
            return Err(Error::InvalidInput(
                "service type must be query, sql or crud".to_string(),
            ));
        }
    };
    Ok(files)
}

impl Coordinator {
    /// `<name>/src/application.json` plus an empty data source.
    pub async fn create_application(&self, name: &str) -> Result<Entry> {
        let dir = self.layout().application_dir(name);
        let _lease = self.lease_for(&dir).await;
        self.check_new(name, &dir).await?;

        let src = ProjectLayout::application_src(&dir);
        write_json(
            self.store(),
            &src.join(APPLICATION_FILE),
            &Application {
                uri: None,
                name: name.to_string(),
            },
        )
        .await?;
        write_json(self.store(), &src.join(DATASOURCE_FILE), &DataSource::default()).await?;
        self.created(&dir).await
    }

    /// `<app>/src/<name>/module.json` in the application `entry` belongs to.
    pub async fn create_module(&self, entry: &Entry, name: &str) -> Result<Entry> {
        let app = self.application_of(entry)?;
        let dir = ProjectLayout::application_src(&app.path).join(name);
        let _lease = self.lease_for(&dir).await;
        self.check_new(name, &dir).await?;

        write_json(
            self.store(),
            &dir.join(MODULE_FILE),
            &Module {
                uri: None,
                name: name.to_string(),
            },
        )
        .await?;
        self.created(&dir).await
    }

    /// A service folder with its descriptor, the starter files of its kind and
    /// an empty `tests/` folder.
    pub async fn create_service(
        &self,
        entry: &Entry,
        name: &str,
        service_type: ServiceType,
    ) -> Result<Entry> {
        let module = entry
            .ancestor_where(|e| e.entry_type == EntryType::Module)
            .ok_or_else(|| {
                Error::InvalidInput(format!("{} is not inside a module", entry.path.display()))
            })?;
        let files = starter_files(service_type)?;
        let dir = module.path.join(name);
        let _lease = self.lease_for(&dir).await;
        self.check_new(name, &dir).await?;

        write_json(
            self.store(),
            &dir.join(SERVICE_FILE),
            &Service {
                uri: None,
                name: name.to_string(),
                service_type,
                state: None,
                reason: None,
            },
        )
        .await?;
        for (relative, body) in files {
            self.store().write(&dir.join(relative), body.as_bytes()).await?;
        }
        self.store().create_dir_all(&dir.join(TESTS_DIR)).await?;
        self.created(&dir).await
    }

    /// Delete an entry and everything below it, locally only.
    pub async fn delete(&self, entry: &Entry) -> Result<()> {
        if entry.entry_type == EntryType::Workspace {
            return Err(Error::InvalidInput(
                "the workspace itself cannot be deleted".to_string(),
            ));
        }
        let _lease = self.lease_for(&entry.path).await;
        self.store().delete(&entry.path).await?;
        info!(path = %entry.path.display(), "deleted");
        self.notify(TreeEvent::Removed {
            path: entry.path.clone(),
        });
        Ok(())
    }

    async fn check_new(&self, name: &str, dir: &Path) -> Result<()> {
        validate_name(name)?;
        if self.store().exists(dir).await? {
            return Err(Error::NameCollision(dir.to_path_buf()));
        }
        Ok(())
    }

    async fn created(&self, dir: &Path) -> Result<Entry> {
        info!(path = %dir.display(), "created");
        if let Some(parent) = dir.parent() {
            self.notify(TreeEvent::Changed {
                parent: parent.to_path_buf(),
            });
        }
        self.tree.find(dir).await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::Fixture;
    use devtime_core::descriptor::ServiceType;
    use devtime_core::{EntryType, Error};

    #[tokio::test]
    async fn test_create_crud_service_lists_in_order() {
        let fx = Fixture::new();
        let module = fx.entry("/ws/shop/src/orders").await;

        let service = fx
            .coordinator
            .create_service(&module, "customers", ServiceType::Crud)
            .await
            .unwrap();

        assert_eq!(service.entry_type, EntryType::CrudService);
        let names: Vec<String> = fx
            .coordinator
            .tree()
            .children(Some(&service))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(
            names,
            vec!["service.json", "object.json", "read", "write", "tests"]
        );
    }

    #[tokio::test]
    async fn test_create_sql_service_has_sqls() {
        let fx = Fixture::new();
        let module = fx.entry("/ws/shop/src/orders").await;

        fx.coordinator
            .create_service(&module, "report", ServiceType::Sql)
            .await
            .unwrap();

        assert_eq!(
            fx.store
                .file_text("/ws/shop/src/orders/report/sqls.sql")
                .as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn test_unknown_service_type_writes_nothing() {
        let fx = Fixture::new();
        let module = fx.entry("/ws/shop/src/orders").await;
        let before = fx.store.snapshot();

        let err = fx
            .coordinator
            .create_service(&module, "odd", ServiceType::Unknown)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(fx.store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_create_application_shows_at_root() {
        let fx = Fixture::new();

        let app = fx.coordinator.create_application("blog").await.unwrap();

        assert_eq!(app.entry_type, EntryType::Application);
        let names: Vec<String> = fx
            .coordinator
            .tree()
            .children(None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["blog", "shop"]);
    }

    #[tokio::test]
    async fn test_create_existing_module_collides() {
        let fx = Fixture::new();
        let shop = fx.entry("/ws/shop").await;
        let before = fx.store.snapshot();

        let err = fx
            .coordinator
            .create_module(&shop, "orders")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NameCollision(_)));
        assert_eq!(fx.store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_delete_is_local_only() {
        let fx = Fixture::new();
        let list = fx.entry("/ws/shop/src/orders/list").await;

        fx.coordinator.delete(&list).await.unwrap();

        assert!(fx.store.file_text("/ws/shop/src/orders/list/service.json").is_none());
        assert!(fx.api.calls().is_empty());
    }
}
