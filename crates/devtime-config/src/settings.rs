//! Workspace settings parsing.

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Name of the settings file at the workspace root.
pub const SETTINGS_FILE: &str = "devtime.kdl";

const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DEPLOY_TIMEOUT_SECS: u64 = 300;

/// Per-call timeouts for remote requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Metadata calls (listing, aggregates, tests, data source calls).
    pub metadata: Duration,
    /// Calls that upload a project archive.
    pub deploy: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            metadata: Duration::from_secs(DEFAULT_METADATA_TIMEOUT_SECS),
            deploy: Duration::from_secs(DEFAULT_DEPLOY_TIMEOUT_SECS),
        }
    }
}

/// Workspace-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Remote workspace name; first segment of every resource URI.
    pub workspace: String,
    /// Base URL of the deployment API.
    pub endpoint: Url,
    /// Base URL deployed services are invoked under.
    pub service_endpoint: Url,
    pub timeouts: Timeouts,
    /// Secret store file; defaults to `.devtime/vault.json` under the root.
    pub vault: Option<PathBuf>,
}

impl Settings {
    pub fn vault_path(&self, root: &Path) -> PathBuf {
        self.vault
            .clone()
            .unwrap_or_else(|| root.join(".devtime").join("vault.json"))
    }
}

/// Read and parse the settings file.
pub fn load_settings(path: &Path) -> ConfigResult<Settings> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&content)
}

/// Parse settings from KDL text.
pub fn parse_settings(kdl: &str) -> ConfigResult<Settings> {
    let doc: KdlDocument = kdl.parse()?;

    let mut workspace = None;
    let mut endpoint = None;
    let mut service_endpoint = None;
    let mut timeouts = None;
    let mut vault = None;

    for node in doc.nodes() {
        let key = node.name().value();
        match key {
            "workspace" => set_once(&mut workspace, key, required_string_arg(node)?)?,
            "endpoint" => set_once(&mut endpoint, key, parse_url(key, node)?)?,
            "service-endpoint" => set_once(&mut service_endpoint, key, parse_url(key, node)?)?,
            "timeouts" => set_once(&mut timeouts, key, parse_timeouts(node)?)?,
            "vault" => set_once(&mut vault, key, PathBuf::from(required_string_arg(node)?))?,
            _ => {} // Ignore unknown nodes
        }
    }

    let workspace = workspace.ok_or_else(|| ConfigError::MissingField("workspace".to_string()))?;
    if workspace.contains('/') || workspace.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "workspace".to_string(),
            message: format!("not a valid workspace name: {:?}", workspace),
        });
    }

    let endpoint = endpoint.ok_or_else(|| ConfigError::MissingField("endpoint".to_string()))?;
    let service_endpoint = service_endpoint.unwrap_or_else(|| endpoint.clone());

    Ok(Settings {
        workspace,
        endpoint,
        service_endpoint,
        timeouts: timeouts.unwrap_or_default(),
        vault,
    })
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> ConfigResult<()> {
    if slot.is_some() {
        return Err(ConfigError::Duplicate(key.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_url(field: &str, node: &KdlNode) -> ConfigResult<Url> {
    let raw = required_string_arg(node)?;
    let url = Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("{}: {}", raw, e),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("{} is not an absolute base URL", raw),
        });
    }
    Ok(url)
}

fn parse_timeouts(node: &KdlNode) -> ConfigResult<Timeouts> {
    let defaults = Timeouts::default();
    Ok(Timeouts {
        metadata: get_secs_prop(node, "metadata")?.unwrap_or(defaults.metadata),
        deploy: get_secs_prop(node, "deploy")?.unwrap_or(defaults.deploy),
    })
}

// Helper functions for extracting values from KDL nodes

fn required_string_arg(node: &KdlNode) -> ConfigResult<String> {
    get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField(format!("value of {}", node.name().value())))
}

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_secs_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<Duration>> {
    let Some(value) = node.get(name) else {
        return Ok(None);
    };
    let secs = value
        .as_integer()
        .ok_or_else(|| ConfigError::InvalidValue {
            field: format!("timeouts.{}", name),
            message: "expected an integer number of seconds".to_string(),
        })?;
    if secs <= 0 {
        return Err(ConfigError::InvalidValue {
            field: format!("timeouts.{}", name),
            message: format!("must be positive, got {}", secs),
        });
    }
    let secs = u64::try_from(secs).map_err(|_| ConfigError::InvalidValue {
        field: format!("timeouts.{}", name),
        message: format!("out of range: {}", secs),
    })?;
    Ok(Some(Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_settings() {
        let kdl = r#"
            workspace "ws"
            endpoint "https://builder.example.com/api"
            service-endpoint "https://builder.example.com/services"
            timeouts metadata=10 deploy=600
            vault "/tmp/vault.json"
        "#;

        let settings = parse_settings(kdl).unwrap();
        assert_eq!(settings.workspace, "ws");
        assert_eq!(settings.endpoint.as_str(), "https://builder.example.com/api");
        assert_eq!(
            settings.service_endpoint.as_str(),
            "https://builder.example.com/services"
        );
        assert_eq!(settings.timeouts.metadata, Duration::from_secs(10));
        assert_eq!(settings.timeouts.deploy, Duration::from_secs(600));
        assert_eq!(
            settings.vault_path(Path::new("/ws")),
            PathBuf::from("/tmp/vault.json")
        );
    }

    #[test]
    fn test_defaults() {
        let kdl = r#"
            workspace "ws"
            endpoint "http://localhost:8080"
        "#;

        let settings = parse_settings(kdl).unwrap();
        assert_eq!(settings.service_endpoint, settings.endpoint);
        assert_eq!(settings.timeouts, Timeouts::default());
        assert_eq!(
            settings.vault_path(Path::new("/ws")),
            PathBuf::from("/ws/.devtime/vault.json")
        );
    }

    #[test]
    fn test_missing_endpoint() {
        let result = parse_settings(r#"workspace "ws""#);
        assert!(matches!(result.unwrap_err(), ConfigError::MissingField(_)));
    }

    #[test]
    fn test_duplicate_workspace() {
        let kdl = r#"
            workspace "a"
            workspace "b"
            endpoint "http://localhost"
        "#;
        assert!(matches!(
            parse_settings(kdl).unwrap_err(),
            ConfigError::Duplicate(_)
        ));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let kdl = r#"
            workspace "ws"
            endpoint "http://localhost"
            timeouts metadata=0
        "#;
        assert!(matches!(
            parse_settings(kdl).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_rejects_relative_endpoint() {
        let kdl = r#"
            workspace "ws"
            endpoint "not a url"
        "#;
        assert!(matches!(
            parse_settings(kdl).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "workspace \"ws\"\nendpoint \"http://localhost\"\n").unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.workspace, "ws");
    }

    #[test]
    fn test_missing_file_names_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        let err = load_settings(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Read { path: ref p, .. } if *p == path));
        assert!(err.to_string().contains(SETTINGS_FILE));
    }
}
