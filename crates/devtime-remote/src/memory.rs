//! In-memory deployment backend.
//!
//! Keeps the deployed graph in a map and records every call in order, so
//! cascades can be checked step by step.

use async_trait::async_trait;
use bytes::Bytes;
use devtime_core::descriptor::DataSource;
use devtime_core::remote::{
    ApplicationAggregate, ApplicationSummary, DeployOutcome, DeploymentApi, ServiceSummary,
    TestCase,
};
use devtime_core::{Error, ResourceUri, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

/// One recorded call, keyed by the resource it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetApplications,
    GetApplicationAggregate(String),
    GetTests(String),
    GetDataSources,
    GetDataSource(String),
    GetDataSourceForApplication(String),
    GetService(String),
    CleanApplication(String),
    CleanDataSource(String),
    CleanWorkspace,
    Deploy(String),
    Undeploy(String),
    TestDataSource { password: String },
    DeployDataSource { app: String, password: String },
}

/// Failure to inject for a matching call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Timeout,
    Connectivity,
    Unauthorized,
}

impl Failure {
    fn into_error(self, call: &Call) -> Error {
        let message = format!("injected failure for {:?}", call);
        match self {
            Failure::NotFound => Error::NotFound(message),
            Failure::Timeout => Error::Timeout(message),
            Failure::Connectivity => Error::Connectivity(message),
            Failure::Unauthorized => Error::Unauthorized(message),
        }
    }
}

#[derive(Default)]
struct State {
    applications: Vec<ApplicationSummary>,
    aggregates: BTreeMap<String, ApplicationAggregate>,
    tests: BTreeMap<String, Vec<TestCase>>,
    data_sources: Vec<DataSource>,
    application_data_sources: BTreeMap<String, DataSource>,
    deployed: BTreeSet<String>,
    outcomes: BTreeMap<String, DeployOutcome>,
    archives: BTreeMap<String, Bytes>,
    failures: Vec<(Call, Failure)>,
    calls: Vec<Call>,
}

/// Deployment backend that lives in memory. Cloning shares the state.
#[derive(Clone, Default)]
pub struct MemoryDeploymentApi {
    state: Arc<Mutex<State>>,
}

impl MemoryDeploymentApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a call and fail it if a failure was injected for it.
    fn enter(&self, call: Call) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(call.clone());
        match state.failures.iter().find(|(c, _)| *c == call) {
            Some((_, failure)) => Err(failure.into_error(&call)),
            None => Ok(()),
        }
    }

    pub fn add_application(&self, aggregate: ApplicationAggregate) {
        let mut state = self.lock();
        state.applications.retain(|a| a.uri != aggregate.uri);
        state.applications.push(ApplicationSummary {
            uri: aggregate.uri.clone(),
            name: aggregate.name.clone(),
            deployed_at: aggregate.deployed_at,
        });
        state.deployed.insert(aggregate.uri.clone());
        for module in &aggregate.modules {
            state.deployed.insert(module.uri.clone());
            for service in &module.services {
                state.deployed.insert(service.uri.clone());
            }
        }
        state.aggregates.insert(aggregate.uri.clone(), aggregate);
    }

    /// List a summary as is, with no aggregate behind it.
    pub fn add_application_summary(&self, summary: ApplicationSummary) {
        self.lock().applications.push(summary);
    }

    pub fn set_tests(&self, service: &str, tests: Vec<TestCase>) {
        self.lock().tests.insert(service.to_string(), tests);
    }

    pub fn add_data_source(&self, data_source: DataSource) {
        self.lock().data_sources.push(data_source);
    }

    pub fn set_application_data_source(&self, app: &str, data_source: DataSource) {
        self.lock()
            .application_data_sources
            .insert(app.to_string(), data_source);
    }

    /// Outcome returned by the next deploys of `uri`.
    pub fn set_deploy_outcome(&self, uri: &str, outcome: DeployOutcome) {
        self.lock().outcomes.insert(uri.to_string(), outcome);
    }

    /// Make every matching call fail.
    pub fn fail(&self, call: Call, failure: Failure) {
        self.lock().failures.push((call, failure));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn is_deployed(&self, uri: &str) -> bool {
        self.lock().deployed.contains(uri)
    }

    /// The last archive uploaded for `uri`.
    pub fn archive(&self, uri: &str) -> Option<Bytes> {
        self.lock().archives.get(uri).cloned()
    }

    fn record_deploy(&self, uri: &ResourceUri, archive: Bytes) -> Result<DeployOutcome> {
        let key = uri.to_string();
        self.enter(Call::Deploy(key.clone()))?;
        let mut state = self.lock();
        state.deployed.insert(key.clone());
        state.archives.insert(key.clone(), archive);
        Ok(state.outcomes.get(&key).cloned().unwrap_or_default())
    }

    fn record_undeploy(&self, uri: &ResourceUri) -> Result<()> {
        let key = uri.to_string();
        self.enter(Call::Undeploy(key.clone()))?;
        let mut state = self.lock();
        if !state.deployed.contains(&key) {
            return Err(Error::NotFound(format!("{} is not deployed", key)));
        }
        let nested = format!("{}/", key);
        state
            .deployed
            .retain(|d| d != &key && !d.starts_with(&nested));
        Ok(())
    }
}

#[async_trait]
impl DeploymentApi for MemoryDeploymentApi {
    async fn get_applications(&self) -> Result<Vec<ApplicationSummary>> {
        self.enter(Call::GetApplications)?;
        Ok(self.lock().applications.clone())
    }

    async fn get_application_aggregate(&self, app: &ResourceUri) -> Result<ApplicationAggregate> {
        let key = app.to_string();
        self.enter(Call::GetApplicationAggregate(key.clone()))?;
        self.lock()
            .aggregates
            .get(&key)
            .cloned()
            .ok_or(Error::NotFound(key))
    }

    async fn get_tests(&self, service: &ResourceUri) -> Result<Vec<TestCase>> {
        let key = service.to_string();
        self.enter(Call::GetTests(key.clone()))?;
        Ok(self.lock().tests.get(&key).cloned().unwrap_or_default())
    }

    async fn get_data_sources(&self) -> Result<Vec<DataSource>> {
        self.enter(Call::GetDataSources)?;
        Ok(self.lock().data_sources.clone())
    }

    async fn get_data_source(&self, name: &str) -> Result<DataSource> {
        self.enter(Call::GetDataSource(name.to_string()))?;
        self.lock()
            .data_sources
            .iter()
            .find(|d| d.name.as_deref() == Some(name))
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    async fn get_data_source_for_application(&self, app: &ResourceUri) -> Result<Option<DataSource>> {
        let key = app.to_string();
        self.enter(Call::GetDataSourceForApplication(key.clone()))?;
        Ok(self.lock().application_data_sources.get(&key).cloned())
    }

    async fn get_service(&self, service: &ResourceUri) -> Result<ServiceSummary> {
        let key = service.to_string();
        self.enter(Call::GetService(key.clone()))?;
        self.lock()
            .aggregates
            .values()
            .flat_map(|a| a.modules.iter())
            .flat_map(|m| m.services.iter())
            .find(|s| s.uri == key)
            .cloned()
            .ok_or(Error::NotFound(key))
    }

    async fn clean_application(&self, app: &ResourceUri) -> Result<()> {
        let key = app.to_string();
        self.enter(Call::CleanApplication(key.clone()))?;
        let mut state = self.lock();
        let nested = format!("{}/", key);
        state.applications.retain(|a| a.uri != key);
        state.aggregates.remove(&key);
        state.application_data_sources.remove(&key);
        state
            .deployed
            .retain(|d| d != &key && !d.starts_with(&nested));
        Ok(())
    }

    async fn clean_data_source(&self, name: &str) -> Result<()> {
        self.enter(Call::CleanDataSource(name.to_string()))?;
        self.lock()
            .data_sources
            .retain(|d| d.name.as_deref() != Some(name));
        Ok(())
    }

    async fn clean_workspace(&self) -> Result<()> {
        self.enter(Call::CleanWorkspace)?;
        let mut state = self.lock();
        state.applications.clear();
        state.aggregates.clear();
        state.data_sources.clear();
        state.application_data_sources.clear();
        state.deployed.clear();
        Ok(())
    }

    async fn deploy_application(&self, app: &ResourceUri, archive: Bytes) -> Result<DeployOutcome> {
        self.record_deploy(app, archive)
    }

    async fn deploy_module(&self, module: &ResourceUri, archive: Bytes) -> Result<DeployOutcome> {
        self.record_deploy(module, archive)
    }

    async fn deploy_service(&self, service: &ResourceUri, archive: Bytes) -> Result<DeployOutcome> {
        self.record_deploy(service, archive)
    }

    async fn undeploy_application(&self, app: &ResourceUri) -> Result<()> {
        self.record_undeploy(app)
    }

    async fn undeploy_module(&self, module: &ResourceUri) -> Result<()> {
        self.record_undeploy(module)
    }

    async fn undeploy_service(&self, service: &ResourceUri) -> Result<()> {
        self.record_undeploy(service)
    }

    async fn test_data_source(&self, data_source: &DataSource) -> Result<()> {
        self.enter(Call::TestDataSource {
            password: data_source.password.clone(),
        })
    }

    async fn deploy_data_source(&self, app: &ResourceUri, data_source: &DataSource) -> Result<()> {
        let key = app.to_string();
        self.enter(Call::DeployDataSource {
            app: key.clone(),
            password: data_source.password.clone(),
        })?;
        self.lock()
            .application_data_sources
            .insert(key, data_source.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> ResourceUri {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_undeploy_unknown_is_not_found() {
        let api = MemoryDeploymentApi::new();
        let err = api.undeploy(&uri("ws/app")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(api.calls(), vec![Call::Undeploy("ws/app".to_string())]);
    }

    #[tokio::test]
    async fn test_deploy_then_undeploy_application_drops_children() {
        let api = MemoryDeploymentApi::new();
        api.deploy(&uri("ws/app"), Bytes::from_static(b"zip"))
            .await
            .unwrap();
        api.deploy(&uri("ws/app/m/s"), Bytes::new()).await.unwrap();

        api.undeploy(&uri("ws/app")).await.unwrap();

        assert!(!api.is_deployed("ws/app"));
        assert!(!api.is_deployed("ws/app/m/s"));
        assert_eq!(api.archive("ws/app").unwrap(), Bytes::from_static(b"zip"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let api = MemoryDeploymentApi::new();
        api.fail(Call::Deploy("ws/app".to_string()), Failure::Timeout);

        let err = api.deploy(&uri("ws/app"), Bytes::new()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert!(!api.is_deployed("ws/app"));
    }
}
