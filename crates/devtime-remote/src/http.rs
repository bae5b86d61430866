//! HTTP deployment API client.

use async_trait::async_trait;
use bytes::Bytes;
use devtime_config::{Settings, Timeouts};
use devtime_core::descriptor::DataSource;
use devtime_core::remote::{
    ApplicationAggregate, ApplicationSummary, DeployOutcome, DeploymentApi, ServiceSummary,
    TestCase,
};
use devtime_core::{Error, ResourceUri, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Deployment API client.
///
/// Every call is scoped to one remote workspace and carries its own timeout:
/// the metadata timeout by default, the deploy timeout for archive uploads.
/// Timed-out calls are reported, never retried.
pub struct HttpDeploymentApi {
    client: reqwest::Client,
    base_url: String,
    workspace: String,
    timeouts: Timeouts,
    token: Option<String>,
}

impl HttpDeploymentApi {
    pub fn new(settings: &Settings, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.endpoint.as_str().trim_end_matches('/').to_string(),
            workspace: settings.workspace.clone(),
            timeouts: settings.timeouts,
            token,
        }
    }

    /// URL of a workspace-relative API path. Segments are percent-encoded.
    fn url(&self, segments: &[&str]) -> String {
        let mut url = format!(
            "{}/workspaces/{}",
            self.base_url,
            urlencoding::encode(&self.workspace)
        );
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    /// URL of a deployable resource, e.g. `.../applications/a/modules/m/services/s`.
    fn resource_url(&self, uri: &ResourceUri, suffix: &[&str]) -> String {
        let mut segments = vec!["applications", uri.application.as_str()];
        if let Some(module) = uri.module.as_deref() {
            segments.extend(["modules", module]);
        }
        if let Some(service) = uri.service.as_deref() {
            segments.extend(["services", service]);
        }
        segments.extend_from_slice(suffix);
        self.url(&segments)
    }

    fn request(&self, method: Method, url: &str, timeout: Duration) -> RequestBuilder {
        debug!("remote call {} {}", method, url);
        let builder = self
            .client
            .request(method, url)
            .timeout(timeout)
            .header("Accept", "application/json")
            .header("User-Agent", "devtime");
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn send(&self, what: &str, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| transport_error(what, e))?;
        check_status(what, response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, what: &str, url: &str) -> Result<T> {
        let builder = self.request(Method::GET, url, self.timeouts.metadata);
        let response = self.send(what, builder).await?;
        response.json().await.map_err(|e| transport_error(what, e))
    }

    async fn post_empty(&self, what: &str, url: &str) -> Result<()> {
        let builder = self.request(Method::POST, url, self.timeouts.metadata);
        self.send(what, builder).await.map(|_| ())
    }

    async fn upload(&self, what: &str, uri: &ResourceUri, archive: Bytes) -> Result<DeployOutcome> {
        let url = self.resource_url(uri, &["deployment"]);
        let builder = self
            .request(Method::PUT, &url, self.timeouts.deploy)
            .header("Content-Type", "application/zip")
            .body(archive);
        let response = self.send(what, builder).await?;
        let text = response.text().await.map_err(|e| transport_error(what, e))?;
        parse_deploy_outcome(what, &text)
    }

    async fn remove_deployment(&self, what: &str, uri: &ResourceUri) -> Result<()> {
        let url = self.resource_url(uri, &["deployment"]);
        let builder = self.request(Method::DELETE, &url, self.timeouts.metadata);
        self.send(what, builder).await.map(|_| ())
    }
}

fn transport_error(what: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("{}: {}", what, e))
    } else if e.is_decode() {
        Error::Remote {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: format!("{}: unexpected response body: {}", what, e),
        }
    } else {
        Error::Connectivity(format!("{}: {}", what, e))
    }
}

/// Map a non-success status to the error taxonomy.
fn status_error(what: &str, status: StatusCode, body: &str) -> Error {
    let message = if body.is_empty() {
        what.to_string()
    } else {
        format!("{}: {}", what, body)
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Error::Timeout(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => Error::Connectivity(message),
        _ => Error::Remote {
            status: status.as_u16(),
            message,
        },
    }
}

async fn check_status(what: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(what, status, body.trim()))
}

fn parse_deploy_outcome(what: &str, text: &str) -> Result<DeployOutcome> {
    if text.trim().is_empty() {
        return Ok(DeployOutcome::default());
    }
    serde_json::from_str(text).map_err(|e| Error::Remote {
        status: 200,
        message: format!("{}: unexpected response body: {}", what, e),
    })
}

#[async_trait]
impl DeploymentApi for HttpDeploymentApi {
    async fn get_applications(&self) -> Result<Vec<ApplicationSummary>> {
        self.get_json("list applications", &self.url(&["applications"]))
            .await
    }

    async fn get_application_aggregate(&self, app: &ResourceUri) -> Result<ApplicationAggregate> {
        let what = format!("fetch aggregate of {}", app);
        self.get_json(&what, &self.resource_url(app, &["aggregate"]))
            .await
    }

    async fn get_tests(&self, service: &ResourceUri) -> Result<Vec<TestCase>> {
        let what = format!("fetch tests of {}", service);
        self.get_json(&what, &self.resource_url(service, &["tests"]))
            .await
    }

    async fn get_data_sources(&self) -> Result<Vec<DataSource>> {
        self.get_json("list data sources", &self.url(&["datasources"]))
            .await
    }

    async fn get_data_source(&self, name: &str) -> Result<DataSource> {
        let what = format!("fetch data source {}", name);
        self.get_json(&what, &self.url(&["datasources", name])).await
    }

    async fn get_data_source_for_application(&self, app: &ResourceUri) -> Result<Option<DataSource>> {
        let what = format!("fetch data source of {}", app);
        match self
            .get_json(&what, &self.resource_url(app, &["datasource"]))
            .await
        {
            Ok(data_source) => Ok(Some(data_source)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_service(&self, service: &ResourceUri) -> Result<ServiceSummary> {
        let what = format!("fetch service {}", service);
        self.get_json(&what, &self.resource_url(service, &[])).await
    }

    async fn clean_application(&self, app: &ResourceUri) -> Result<()> {
        let what = format!("clean {}", app);
        self.post_empty(&what, &self.resource_url(app, &["clean"]))
            .await
    }

    async fn clean_data_source(&self, name: &str) -> Result<()> {
        let what = format!("clean data source {}", name);
        self.post_empty(&what, &self.url(&["datasources", name, "clean"]))
            .await
    }

    async fn clean_workspace(&self) -> Result<()> {
        self.post_empty("clean workspace", &self.url(&["clean"]))
            .await
    }

    async fn deploy_application(&self, app: &ResourceUri, archive: Bytes) -> Result<DeployOutcome> {
        self.upload(&format!("deploy application {}", app), app, archive)
            .await
    }

    async fn deploy_module(&self, module: &ResourceUri, archive: Bytes) -> Result<DeployOutcome> {
        self.upload(&format!("deploy module {}", module), module, archive)
            .await
    }

    async fn deploy_service(&self, service: &ResourceUri, archive: Bytes) -> Result<DeployOutcome> {
        self.upload(&format!("deploy service {}", service), service, archive)
            .await
    }

    async fn undeploy_application(&self, app: &ResourceUri) -> Result<()> {
        self.remove_deployment(&format!("undeploy application {}", app), app)
            .await
    }

    async fn undeploy_module(&self, module: &ResourceUri) -> Result<()> {
        self.remove_deployment(&format!("undeploy module {}", module), module)
            .await
    }

    async fn undeploy_service(&self, service: &ResourceUri) -> Result<()> {
        self.remove_deployment(&format!("undeploy service {}", service), service)
            .await
    }

    async fn test_data_source(&self, data_source: &DataSource) -> Result<()> {
        let url = self.url(&["datasources", "test"]);
        let builder = self
            .request(Method::POST, &url, self.timeouts.metadata)
            .json(data_source);
        self.send("test data source", builder).await.map(|_| ())
    }

    async fn deploy_data_source(&self, app: &ResourceUri, data_source: &DataSource) -> Result<()> {
        let what = format!("deploy data source of {}", app);
        let url = self.resource_url(app, &["datasource"]);
        let builder = self
            .request(Method::PUT, &url, self.timeouts.metadata)
            .json(data_source);
        self.send(&what, builder).await.map(|_| ())
    }
}
