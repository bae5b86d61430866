//! Remote deployment API contract.
//!
//! Only request and response shapes live here; transport belongs to the
//! implementing backend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::descriptor::{DataSource, STATE_VALID, ServiceType};
use crate::uri::ResourceLevel;
use crate::{Error, ResourceUri, Result};

/// A deployed application as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
}

/// A deployed service with its backend-assigned validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub uri: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ServiceSummary {
    pub fn is_valid(&self) -> bool {
        self.state.as_deref() == Some(STATE_VALID)
    }

    /// The validation failure the backend recorded for this service, if any.
    pub fn validation_failure(&self) -> Option<Error> {
        if self.is_valid() {
            return None;
        }
        Some(Error::RemoteValidationFailure {
            uri: self.uri.clone(),
            reason: self.reason.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAggregate {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub services: Vec<ServiceSummary>,
}

/// One application's full deployed graph, fetched in a single round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationAggregate {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modules: Vec<ModuleAggregate>,
}

/// A literal test case stored with a deployed service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    /// CRUD operation name (`create`, `read`, `update`, `delete`); unset for
    /// query and sql services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default)]
    pub input: serde_json::Value,
}

/// Result of a deploy call: the services the backend now holds under the
/// deployed identity, each with its validity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployOutcome {
    #[serde(default)]
    pub services: Vec<ServiceSummary>,
}

impl DeployOutcome {
    /// Services the backend marked invalid. These are data, not errors.
    pub fn invalid_services(&self) -> impl Iterator<Item = &ServiceSummary> {
        self.services.iter().filter(|s| !s.is_valid())
    }
}

/// Trait for the remote deployment backend.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    async fn get_applications(&self) -> Result<Vec<ApplicationSummary>>;

    async fn get_application_aggregate(&self, app: &ResourceUri) -> Result<ApplicationAggregate>;

    async fn get_tests(&self, service: &ResourceUri) -> Result<Vec<TestCase>>;

    async fn get_data_sources(&self) -> Result<Vec<DataSource>>;

    async fn get_data_source(&self, name: &str) -> Result<DataSource>;

    async fn get_data_source_for_application(&self, app: &ResourceUri) -> Result<Option<DataSource>>;

    async fn get_service(&self, service: &ResourceUri) -> Result<ServiceSummary>;

    async fn clean_application(&self, app: &ResourceUri) -> Result<()>;

    async fn clean_data_source(&self, name: &str) -> Result<()>;

    async fn clean_workspace(&self) -> Result<()>;

    async fn deploy_application(&self, app: &ResourceUri, archive: Bytes) -> Result<DeployOutcome>;

    async fn deploy_module(&self, module: &ResourceUri, archive: Bytes) -> Result<DeployOutcome>;

    async fn deploy_service(&self, service: &ResourceUri, archive: Bytes) -> Result<DeployOutcome>;

    async fn undeploy_application(&self, app: &ResourceUri) -> Result<()>;

    async fn undeploy_module(&self, module: &ResourceUri) -> Result<()>;

    async fn undeploy_service(&self, service: &ResourceUri) -> Result<()>;

    async fn test_data_source(&self, data_source: &DataSource) -> Result<()>;

    async fn deploy_data_source(&self, app: &ResourceUri, data_source: &DataSource) -> Result<()>;

    /// Upload an archive for whatever level the URI names. Redeploying the
    /// same identity replaces the prior deployment.
    async fn deploy(&self, uri: &ResourceUri, archive: Bytes) -> Result<DeployOutcome> {
        match uri.level() {
            ResourceLevel::Application => self.deploy_application(uri, archive).await,
            ResourceLevel::Module => self.deploy_module(uri, archive).await,
            ResourceLevel::Service => self.deploy_service(uri, archive).await,
        }
    }

    /// Remove the deployment of whatever level the URI names.
    async fn undeploy(&self, uri: &ResourceUri) -> Result<()> {
        match uri.level() {
            ResourceLevel::Application => self.undeploy_application(uri).await,
            ResourceLevel::Module => self.undeploy_module(uri).await,
            ResourceLevel::Service => self.undeploy_service(uri).await,
        }
    }
}

/// Builds the upload archive of a project subtree.
#[async_trait]
pub trait Packager: Send + Sync {
    async fn package(&self, root: &Path) -> Result<Bytes>;
}
