//! Descriptor file shapes.
//!
//! Every application, module, service and data source is defined by a small
//! JSON file. These types read and write them; unknown fields are dropped, so
//! in-place edits that must preserve foreign fields go through
//! [`crate::store::update_name`] instead.

use serde::{Deserialize, Serialize};

/// Kind of a service, read from the `type` field of `service.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Query,
    Sql,
    Crud,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceType::Query => write!(f, "query"),
            ServiceType::Sql => write!(f, "sql"),
            ServiceType::Crud => write!(f, "crud"),
            ServiceType::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for ServiceType {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "query" => Ok(ServiceType::Query),
            "sql" => Ok(ServiceType::Sql),
            "crud" => Ok(ServiceType::Crud),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown service type: {} (expected query, sql or crud)",
                other
            ))),
        }
    }
}

/// Remote state value marking a deployed service as usable.
pub const STATE_VALID: &str = "valid";

/// `application.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub name: String,
}

/// `module.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub name: String,
}

/// `service.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    /// Remote validity state; only ever copied from the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Why the backend considers the service invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Service {
    pub fn is_valid(&self) -> bool {
        self.state.as_deref() == Some(STATE_VALID)
    }
}

/// `datasource.json`
///
/// `password` holds either the real secret or the vault mask.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub db_type: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_field_is_named_type() {
        let svc: Service =
            serde_json::from_str(r#"{"name":"orders","type":"crud"}"#).unwrap();
        assert_eq!(svc.service_type, ServiceType::Crud);
        assert!(svc.state.is_none());
    }

    #[test]
    fn test_unknown_service_type_degrades() {
        let svc: Service =
            serde_json::from_str(r#"{"name":"x","type":"graphql"}"#).unwrap();
        assert_eq!(svc.service_type, ServiceType::Unknown);
    }

    #[test]
    fn test_data_source_camel_case() {
        let ds: DataSource = serde_json::from_str(
            r#"{"dbType":"postgres","host":"db","port":5432,"database":"shop","username":"u","password":"p"}"#,
        )
        .unwrap();
        assert_eq!(ds.db_type, "postgres");
        assert_eq!(ds.port, 5432);

        let json = serde_json::to_value(&ds).unwrap();
        assert_eq!(json["dbType"], "postgres");
        assert!(json.get("uri").is_none());
    }

    #[test]
    fn test_service_validity() {
        let mut svc = Service {
            uri: None,
            name: "s".to_string(),
            service_type: ServiceType::Query,
            state: Some("valid".to_string()),
            reason: None,
        };
        assert!(svc.is_valid());
        svc.state = Some("invalid".to_string());
        assert!(!svc.is_valid());
    }
}
