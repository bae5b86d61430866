//! Deployment mirror synchronizer.
//!
//! Every refresh fetches its slice of the remote graph in one call, then
//! deletes the matching mirror folder and writes it again from scratch. The
//! graphs are small, so nothing is diffed.

use devtime_core::descriptor::{DataSource, Module};
use devtime_core::remote::{ApplicationAggregate, ApplicationSummary, DeploymentApi, ServiceSummary};
use devtime_core::store::{write_json, DescriptorStore};
use devtime_core::{Error, Item, ItemType, ResourceLevel, ResourceUri, Result};
use devtime_tree::ProjectLayout;
use devtime_vault::MASK;
use futures::future::try_join_all;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::paths::{checked_segment, MirrorLayout};
use crate::reader::MirrorTree;
use crate::script::render_test_script;

pub struct Synchronizer {
    api: Arc<dyn DeploymentApi>,
    store: Arc<dyn DescriptorStore>,
    layout: MirrorLayout,
    workspace: String,
    service_endpoint: String,
}

impl Synchronizer {
    pub fn new(
        api: Arc<dyn DeploymentApi>,
        store: Arc<dyn DescriptorStore>,
        project: &ProjectLayout,
        service_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            layout: MirrorLayout::new(project),
            workspace: project.workspace().to_string(),
            service_endpoint: service_endpoint.into(),
        }
    }

    pub fn layout(&self) -> &MirrorLayout {
        &self.layout
    }

    /// Reader over the folder this synchronizer writes.
    pub fn mirror(&self) -> MirrorTree {
        MirrorTree::new(self.store.clone(), self.layout.clone())
    }

    /// Replace the mirrored application list. Module and service folders of
    /// every application go with it; see [`Synchronizer::refresh_all`].
    pub async fn refresh_app_list(&self) -> Result<Vec<ResourceUri>> {
        let applications = self.api.get_applications().await?;
        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(applications.len());
        for summary in applications {
            let uri = parse_uri(&summary.uri, ResourceLevel::Application)?;
            if uri.workspace != self.workspace {
                return Err(Error::InvalidInput(format!(
                    "{} is not part of workspace {}",
                    summary.uri, self.workspace
                )));
            }
            if !seen.insert(uri.application.clone()) {
                return Err(Error::InvalidInput(format!(
                    "application {} is listed twice",
                    uri.application
                )));
            }
            records.push((uri, summary));
        }

        self.wipe(&self.layout.applications()).await?;
        for (uri, summary) in &records {
            write_json(self.store.as_ref(), &self.layout.record(uri), summary).await?;
        }
        info!(count = records.len(), "application mirror replaced");
        Ok(records.into_iter().map(|(uri, _)| uri).collect())
    }

    /// Replace one mirrored application with its remote aggregate.
    pub async fn refresh_app(&self, app: &Item) -> Result<()> {
        if app.item_type != ItemType::Application {
            return Err(Error::InvalidInput(format!(
                "{} is not an application",
                app.name
            )));
        }
        let uri = parse_uri(&app.remote_uri, ResourceLevel::Application)?;
        self.refresh_application(&uri).await
    }

    /// Replace one mirrored application by identity.
    pub async fn refresh_application(&self, app: &ResourceUri) -> Result<()> {
        let aggregate = self.api.get_application_aggregate(app).await?;
        let records = AggregateRecords::from_aggregate(app, aggregate)?;

        self.wipe(&self.layout.folder(app)).await?;
        let store = self.store.as_ref();
        write_json(store, &self.layout.record(app), &records.application).await?;
        for (uri, module) in &records.modules {
            write_json(store, &self.layout.record(uri), module).await?;
        }
        for (uri, service) in &records.services {
            write_json(store, &self.layout.record(uri), service).await?;
        }
        info!(
            app = %app,
            modules = records.modules.len(),
            services = records.services.len(),
            "application mirror replaced"
        );
        Ok(())
    }

    /// Rewrite one mirrored service record with its current remote state.
    /// The service's module must already be mirrored.
    pub async fn refresh_service(&self, service: &ResourceUri) -> Result<Item> {
        if service.level() != ResourceLevel::Service || service.module.is_none() {
            return Err(Error::InvalidInput(format!("{} is not a service", service)));
        }
        let module = ResourceUri {
            service: None,
            ..service.clone()
        };
        let record = self.layout.record(&module);
        if !self.store.exists(&record).await? {
            return Err(Error::NotFound(format!("{} is not mirrored", module)));
        }

        let summary = self.api.get_service(service).await?;
        let uri = child_uri(&module, &summary.uri, ResourceLevel::Service)?;
        if uri != *service {
            return Err(Error::InvalidInput(format!(
                "asked for {}, backend answered {}",
                service, summary.uri
            )));
        }
        write_json(self.store.as_ref(), &self.layout.record(service), &summary).await?;
        debug!(service = %service, state = ?summary.state, "service record replaced");
        self.mirror().find(service).await
    }

    /// Refresh the application list, then every application concurrently.
    pub async fn refresh_all(&self) -> Result<Vec<ResourceUri>> {
        let applications = self.refresh_app_list().await?;
        try_join_all(applications.iter().map(|app| self.refresh_application(app))).await?;
        Ok(applications)
    }

    /// Replace the mirrored data sources. Passwords are written masked.
    pub async fn refresh_data_source_list(&self) -> Result<Vec<String>> {
        let data_sources = self.api.get_data_sources().await?;
        let records = data_sources
            .into_iter()
            .map(|data_source| {
                let path = self.layout.data_source(&data_source_name(&data_source)?)?;
                Ok((path, masked(data_source)))
            })
            .collect::<Result<Vec<(PathBuf, DataSource)>>>()?;

        self.wipe(&self.layout.data_sources()).await?;
        let mut names = Vec::with_capacity(records.len());
        for (path, data_source) in &records {
            write_json(self.store.as_ref(), path, data_source).await?;
            names.extend(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned()),
            );
        }
        info!(count = names.len(), "data source mirror replaced");
        Ok(names)
    }

    /// Rewrite one mirrored data source, masked.
    pub async fn refresh_data_source(&self, name: &str) -> Result<PathBuf> {
        let path = self.layout.data_source(name)?;
        let data_source = self.api.get_data_source(name).await?;
        write_json(self.store.as_ref(), &path, &masked(data_source)).await?;
        debug!(name, "data source record replaced");
        Ok(path)
    }

    /// The data source the backend holds for an application, masked.
    pub async fn application_data_source(&self, app: &ResourceUri) -> Result<Option<DataSource>> {
        if app.level() != ResourceLevel::Application {
            return Err(Error::InvalidInput(format!("{} is not an application", app)));
        }
        let data_source = self.api.get_data_source_for_application(app).await?;
        Ok(data_source.map(masked))
    }

    /// Fetch a service's test cases and write them as a request script next
    /// to its mirror record.
    pub async fn reload_tests(&self, service: &Item) -> Result<PathBuf> {
        if !service.item_type.is_service() {
            return Err(Error::InvalidInput(format!(
                "{} is not a service",
                service.name
            )));
        }
        let uri = parse_uri(&service.remote_uri, ResourceLevel::Service)?;
        let tests = self.api.get_tests(&uri).await?;

        let path = self.layout.tests_script(&uri);
        let crud = service.item_type == ItemType::CrudService;
        let script = render_test_script(&self.service_endpoint, &service.remote_uri, crud, &tests)
            .map_err(|source| Error::Serialization {
                path: path.clone(),
                source,
            })?;
        self.store.write(&path, script.as_bytes()).await?;
        debug!(service = %uri, tests = tests.len(), "test script written");
        Ok(path)
    }

    /// Clean an application on the backend, then its mirror folder.
    pub async fn clean_application(&self, app: &ResourceUri) -> Result<()> {
        self.api.clean_application(app).await?;
        match self.refresh_application(app).await {
            Err(e) if e.is_not_found() => {
                debug!(app = %app, "application gone remotely, dropping its mirror");
                self.store.delete(&self.layout.folder(app)).await
            }
            other => other,
        }
    }

    pub async fn clean_data_source(&self, name: &str) -> Result<()> {
        self.api.clean_data_source(name).await?;
        self.refresh_data_source_list().await.map(|_| ())
    }

    pub async fn clean_workspace(&self) -> Result<()> {
        self.api.clean_workspace().await?;
        futures::try_join!(self.refresh_app_list(), self.refresh_data_source_list())?;
        Ok(())
    }

    async fn wipe(&self, folder: &Path) -> Result<()> {
        debug!(folder = %folder.display(), "wiping mirror folder");
        self.store.delete(folder).await?;
        self.store.create_dir_all(folder).await
    }
}

/// Mirror records of one aggregate, checked before anything is deleted.
struct AggregateRecords {
    application: ApplicationSummary,
    modules: Vec<(ResourceUri, Module)>,
    services: Vec<(ResourceUri, ServiceSummary)>,
}

impl AggregateRecords {
    fn from_aggregate(app: &ResourceUri, aggregate: ApplicationAggregate) -> Result<Self> {
        let mut modules = Vec::with_capacity(aggregate.modules.len());
        let mut services = Vec::new();
        for module in aggregate.modules {
            let module_uri = child_uri(app, &module.uri, ResourceLevel::Module)?;
            for service in module.services {
                let service_uri = child_uri(&module_uri, &service.uri, ResourceLevel::Service)?;
                services.push((service_uri, service));
            }
            modules.push((
                module_uri,
                Module {
                    uri: Some(module.uri),
                    name: module.name,
                },
            ));
        }
        Ok(Self {
            application: ApplicationSummary {
                uri: app.to_string(),
                name: aggregate.name,
                deployed_at: aggregate.deployed_at,
            },
            modules,
            services,
        })
    }
}

fn parse_uri(raw: &str, level: ResourceLevel) -> Result<ResourceUri> {
    let uri: ResourceUri = raw.parse()?;
    if uri.level() != level {
        return Err(Error::InvalidInput(format!(
            "expected a {:?} uri, got {}",
            level, raw
        )));
    }
    Ok(uri)
}

/// URI of a remote child, which must sit directly under `parent`.
fn child_uri(parent: &ResourceUri, raw: &str, level: ResourceLevel) -> Result<ResourceUri> {
    let uri = parse_uri(raw, level)?;
    let under_parent = uri.workspace == parent.workspace
        && uri.application == parent.application
        && (parent.module.is_none() || uri.module == parent.module);
    if !under_parent {
        return Err(Error::InvalidInput(format!(
            "{} is not part of {}",
            raw, parent
        )));
    }
    Ok(uri)
}

fn data_source_name(data_source: &DataSource) -> Result<String> {
    let name = data_source
        .name
        .clone()
        .or_else(|| {
            data_source
                .uri
                .as_deref()
                .and_then(|uri| uri.rsplit('/').next())
                .map(str::to_string)
        })
        .unwrap_or_default();
    checked_segment(&name)?;
    Ok(name)
}

fn masked(mut data_source: DataSource) -> DataSource {
    if !data_source.password.is_empty() {
        data_source.password = MASK.to_string();
    }
    data_source
}

#[cfg(test)]
mod tests {
    use super::*;
    use devtime_core::descriptor::ServiceType;
    use devtime_core::remote::{ModuleAggregate, TestCase};
    use devtime_remote::{Call, Failure, MemoryDeploymentApi};
    use devtime_store::MemoryStore;
    use serde_json::json;

    fn service(uri: &str, service_type: ServiceType, state: &str, reason: Option<&str>) -> ServiceSummary {
        ServiceSummary {
            uri: uri.to_string(),
            name: uri.rsplit('/').next().unwrap().to_string(),
            service_type,
            state: Some(state.to_string()),
            reason: reason.map(str::to_string),
        }
    }

    fn shop() -> ApplicationAggregate {
        ApplicationAggregate {
            uri: "ws/shop".to_string(),
            name: "shop".to_string(),
            deployed_at: None,
            modules: vec![ModuleAggregate {
                uri: "ws/shop/orders".to_string(),
                name: "orders".to_string(),
                services: vec![
                    service("ws/shop/orders/list", ServiceType::Query, "valid", None),
                    service(
                        "ws/shop/orders/edit",
                        ServiceType::Crud,
                        "invalid",
                        Some("table orders has no primary key"),
                    ),
                ],
            }],
        }
    }

    fn blog() -> ApplicationAggregate {
        ApplicationAggregate {
            uri: "ws/blog".to_string(),
            name: "blog".to_string(),
            deployed_at: None,
            modules: Vec::new(),
        }
    }

    fn setup() -> (Synchronizer, MemoryDeploymentApi, MemoryStore) {
        let api = MemoryDeploymentApi::new();
        let store = MemoryStore::new();
        let sync = Synchronizer::new(
            Arc::new(api.clone()),
            Arc::new(store.clone()),
            &ProjectLayout::new("/ws", "ws"),
            "https://svc.example.com",
        );
        (sync, api, store)
    }

    #[tokio::test]
    async fn test_app_list_matches_remote_one_to_one() {
        let (sync, api, store) = setup();
        api.add_application(shop());
        api.add_application(blog());
        store.insert_file("/ws/.devtime/applications/stale/application", "{}");

        sync.refresh_app_list().await.unwrap();

        let names: Vec<String> = sync
            .mirror()
            .children(None)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["blog", "shop"]);
    }

    #[tokio::test]
    async fn test_refresh_app_keeps_remote_state_verbatim() {
        let (sync, api, _) = setup();
        api.add_application(shop());
        sync.refresh_all().await.unwrap();

        let mirror = sync.mirror();
        let uri: ResourceUri = "ws/shop/orders/edit".parse().unwrap();
        let edit = mirror.find(&uri).await.unwrap();
        assert_eq!(edit.item_type, ItemType::CrudService);
        assert_eq!(edit.state.as_deref(), Some("invalid"));
        assert_eq!(edit.reason.as_deref(), Some("table orders has no primary key"));
        assert!(!edit.is_valid());
        assert_eq!(edit.parent.as_ref().unwrap().item_type, ItemType::Module);

        let list = mirror
            .find(&"ws/shop/orders/list".parse().unwrap())
            .await
            .unwrap();
        assert!(list.is_valid());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_mirror_untouched() {
        let (sync, api, store) = setup();
        api.add_application(shop());
        sync.refresh_all().await.unwrap();
        let before = store.snapshot();

        api.fail(
            Call::GetApplicationAggregate("ws/shop".to_string()),
            Failure::Timeout,
        );
        let app = sync
            .mirror()
            .find(&"ws/shop".parse().unwrap())
            .await
            .unwrap();
        let err = sync.refresh_app(&app).await.unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_refresh_app_replaces_removed_services() {
        let (sync, api, _) = setup();
        api.add_application(shop());
        sync.refresh_application(&"ws/shop".parse().unwrap())
            .await
            .unwrap();

        let mut smaller = shop();
        smaller.modules[0].services.truncate(1);
        api.add_application(smaller);
        sync.refresh_application(&"ws/shop".parse().unwrap())
            .await
            .unwrap();

        let err = sync
            .mirror()
            .find(&"ws/shop/orders/edit".parse().unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_data_sources_are_mirrored_masked() {
        let (sync, api, store) = setup();
        api.add_data_source(DataSource {
            name: Some("main".to_string()),
            db_type: "postgres".to_string(),
            password: "hunter2".to_string(),
            ..DataSource::default()
        });

        let names = sync.refresh_data_source_list().await.unwrap();

        assert_eq!(names, vec!["main"]);
        let text = store.file_text("/ws/.devtime/datasources/main").unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains(MASK));
        let items = sync.mirror().data_sources().await.unwrap();
        assert_eq!(items[0].item_type, ItemType::DataSource);
    }

    #[tokio::test]
    async fn test_reload_tests_writes_crud_script() {
        let (sync, api, store) = setup();
        api.add_application(shop());
        api.set_tests(
            "ws/shop/orders/edit",
            vec![TestCase {
                name: "T3".to_string(),
                operation: Some("update".to_string()),
                input: json!({"id": 7}),
            }],
        );
        sync.refresh_all().await.unwrap();
        let edit = sync
            .mirror()
            .find(&"ws/shop/orders/edit".parse().unwrap())
            .await
            .unwrap();

        let path = sync.reload_tests(&edit).await.unwrap();

        assert_eq!(
            store.file_text(&path).unwrap(),
            "### T3\nPOST https://svc.example.com/ws/shop/orders/edit/update\n\n{\n  \"id\": 7\n}\n\n"
        );
    }

    #[tokio::test]
    async fn test_clean_application_drops_mirror_folder() {
        let (sync, api, store) = setup();
        api.add_application(shop());
        api.add_application(blog());
        sync.refresh_all().await.unwrap();

        sync.clean_application(&"ws/shop".parse().unwrap())
            .await
            .unwrap();

        assert!(!store
            .exists(Path::new("/ws/.devtime/applications/shop"))
            .await
            .unwrap());
        assert!(store
            .exists(Path::new("/ws/.devtime/applications/blog/application"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_foreign_child_uri_is_rejected_before_wipe() {
        let (sync, api, store) = setup();
        let mut bad = shop();
        bad.modules[0].uri = "ws/blog/orders".to_string();
        api.add_application(bad);
        store.insert_file("/ws/.devtime/applications/shop/application", "{}");
        let before = store.snapshot();

        let err = sync
            .refresh_application(&"ws/shop".parse().unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_app_list_from_other_workspace_is_rejected_before_wipe() {
        let (sync, api, store) = setup();
        api.add_application(shop());
        let mut foreign = blog();
        foreign.uri = "elsewhere/blog".to_string();
        api.add_application(foreign);
        store.insert_file("/ws/.devtime/applications/stale/application", "{}");
        let before = store.snapshot();

        let err = sync.refresh_app_list().await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_app_listed_twice_is_rejected_before_wipe() {
        let (sync, api, store) = setup();
        api.add_application(shop());
        api.add_application_summary(ApplicationSummary {
            uri: "ws/shop".to_string(),
            name: "shop (copy)".to_string(),
            deployed_at: None,
        });
        store.insert_file("/ws/.devtime/applications/stale/application", "{}");
        let before = store.snapshot();

        let err = sync.refresh_app_list().await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_refresh_service_rewrites_state_only_for_that_service() {
        let (sync, api, _) = setup();
        api.add_application(shop());
        sync.refresh_all().await.unwrap();

        let mut fixed = shop();
        fixed.modules[0].services[1].state = Some("valid".to_string());
        fixed.modules[0].services[1].reason = None;
        fixed.modules[0].services[0].state = Some("invalid".to_string());
        api.add_application(fixed);

        let edit: ResourceUri = "ws/shop/orders/edit".parse().unwrap();
        let item = sync.refresh_service(&edit).await.unwrap();

        assert!(item.is_valid());
        assert_eq!(item.reason, None);
        assert!(api.calls().contains(&Call::GetService("ws/shop/orders/edit".to_string())));
        let list = sync
            .mirror()
            .find(&"ws/shop/orders/list".parse().unwrap())
            .await
            .unwrap();
        assert!(list.is_valid());
    }

    #[tokio::test]
    async fn test_refresh_service_needs_mirrored_module() {
        let (sync, api, store) = setup();
        api.add_application(shop());
        let before = store.snapshot();

        let err = sync
            .refresh_service(&"ws/shop/orders/list".parse().unwrap())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.snapshot(), before);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_one_data_source_masks_password() {
        let (sync, api, store) = setup();
        api.add_data_source(DataSource {
            name: Some("main".to_string()),
            db_type: "postgres".to_string(),
            password: "hunter2".to_string(),
            ..DataSource::default()
        });
        store.insert_file("/ws/.devtime/datasources/other", "{}");

        let path = sync.refresh_data_source("main").await.unwrap();

        let text = store.file_text(&path).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains(MASK));
        assert!(store.file_text("/ws/.devtime/datasources/other").is_some());
        assert_eq!(api.calls(), vec![Call::GetDataSource("main".to_string())]);
    }

    #[tokio::test]
    async fn test_application_data_source_is_masked() {
        let (sync, api, _) = setup();
        api.set_application_data_source(
            "ws/shop",
            DataSource {
                name: Some("shop".to_string()),
                db_type: "postgres".to_string(),
                password: "hunter2".to_string(),
                ..DataSource::default()
            },
        );

        let shop = sync
            .application_data_source(&"ws/shop".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        let blog = sync
            .application_data_source(&"ws/blog".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(shop.password, MASK);
        assert_eq!(shop.db_type, "postgres");
        assert!(blog.is_none());
    }
}
