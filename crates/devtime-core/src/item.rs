//! Deployment mirror nodes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::descriptor::{STATE_VALID, ServiceType};

/// Classification of a node in the deployment mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Application,
    Module,
    QueryService,
    SqlService,
    CrudService,
    DataSource,
    Other,
}

impl ItemType {
    pub fn from_service_type(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::Query => ItemType::QueryService,
            ServiceType::Sql => ItemType::SqlService,
            ServiceType::Crud => ItemType::CrudService,
            ServiceType::Unknown => ItemType::Other,
        }
    }

    pub fn is_service(&self) -> bool {
        matches!(
            self,
            ItemType::QueryService | ItemType::SqlService | ItemType::CrudService
        )
    }
}

/// A node of the local mirror of the remote deployed graph.
///
/// `state` and `reason` are copied verbatim from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub remote_uri: String,
    pub item_type: ItemType,
    pub name: String,
    pub state: Option<String>,
    pub reason: Option<String>,
    /// Descriptor file of this item inside the mirror folder.
    pub file_path: PathBuf,
    pub parent: Option<Box<Item>>,
}

impl Item {
    /// Services are valid only when the backend says so; other items have no
    /// validity of their own.
    pub fn is_valid(&self) -> bool {
        !self.item_type.is_service() || self.state.as_deref() == Some(STATE_VALID)
    }

    /// Directory holding this item's descriptor and its children.
    pub fn folder(&self) -> PathBuf {
        self.file_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
    }
}
