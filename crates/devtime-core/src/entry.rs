//! Local project tree nodes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::descriptor::ServiceType;

/// Kind of file system object backing a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Classification of a node in the local project tree.
///
/// Always inferred from reserved names and service descriptors, never
/// declared by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum EntryType {
    /// The workspace root; never listed as a child.
    Workspace,
    Application,
    /// `application.json`
    ApplicationDescriptor,
    /// `datasource.json`
    DataSource,
    Module,
    /// `module.json`
    ModuleDescriptor,
    QueryService,
    SqlService,
    CrudService,
    /// `service.json`
    ServiceDescriptor,
    /// `input.json`
    Input,
    /// `output.json`
    Output,
    /// `query.sql`
    Query,
    /// `sqls.sql`
    Sqls,
    /// `input-bindings.json`
    InputBindings,
    /// `output-bindings.json`
    OutputBindings,
    /// `object.json`
    Object,
    /// `read/`
    ReadBlock,
    /// `write/`
    WriteBlock,
    /// `tables.json`
    Tables,
    /// `<table>.columns.json`
    Columns,
    /// `tests/`
    TestsFolder,
    Test,
    Other,
}

impl EntryType {
    /// Map a service descriptor's type to the entry type of its directory.
    pub fn from_service_type(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::Query => EntryType::QueryService,
            ServiceType::Sql => EntryType::SqlService,
            ServiceType::Crud => EntryType::CrudService,
            ServiceType::Unknown => EntryType::Other,
        }
    }

    pub fn service_type(&self) -> Option<ServiceType> {
        match self {
            EntryType::QueryService => Some(ServiceType::Query),
            EntryType::SqlService => Some(ServiceType::Sql),
            EntryType::CrudService => Some(ServiceType::Crud),
            _ => None,
        }
    }

    pub fn is_service(&self) -> bool {
        self.service_type().is_some()
    }

    /// Whether entries of this type can be deployed on their own.
    pub fn is_deployable(&self) -> bool {
        matches!(self, EntryType::Application | EntryType::Module) || self.is_service()
    }
}

/// Role of a file or folder inside a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    Descriptor,
    Input,
    Output,
    Query,
    Sqls,
    InputBindings,
    OutputBindings,
    Object,
    ReadBlock,
    WriteBlock,
    Tables,
    Columns,
    Tests,
    Test,
}

impl ComponentType {
    pub fn from_entry_type(entry_type: EntryType) -> Option<Self> {
        match entry_type {
            EntryType::ServiceDescriptor => Some(ComponentType::Descriptor),
            EntryType::Input => Some(ComponentType::Input),
            EntryType::Output => Some(ComponentType::Output),
            EntryType::Query => Some(ComponentType::Query),
            EntryType::Sqls => Some(ComponentType::Sqls),
            EntryType::InputBindings => Some(ComponentType::InputBindings),
            EntryType::OutputBindings => Some(ComponentType::OutputBindings),
            EntryType::Object => Some(ComponentType::Object),
            EntryType::ReadBlock => Some(ComponentType::ReadBlock),
            EntryType::WriteBlock => Some(ComponentType::WriteBlock),
            EntryType::Tables => Some(ComponentType::Tables),
            EntryType::Columns => Some(ComponentType::Columns),
            EntryType::TestsFolder => Some(ComponentType::Tests),
            EntryType::Test => Some(ComponentType::Test),
            EntryType::Workspace
            | EntryType::Application
            | EntryType::ApplicationDescriptor
            | EntryType::DataSource
            | EntryType::Module
            | EntryType::ModuleDescriptor
            | EntryType::QueryService
            | EntryType::SqlService
            | EntryType::CrudService
            | EntryType::Other => None,
        }
    }
}

/// A node in the local project tree.
///
/// Entries are recomputed on every listing; the parent chain is owned by the
/// entry and never shared across listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub entry_type: EntryType,
    /// Kind of the service this node is, or belongs to.
    pub service_type: Option<ServiceType>,
    pub component_type: Option<ComponentType>,
    pub name: String,
    pub kind: EntryKind,
    pub parent: Option<Box<Entry>>,
    pub sequence_number: u32,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Nearest entry (self included) matching the predicate, walking parents.
    pub fn ancestor_where(&self, predicate: impl Fn(&Entry) -> bool) -> Option<&Entry> {
        let mut current = Some(self);
        while let Some(entry) = current {
            if predicate(entry) {
                return Some(entry);
            }
            current = entry.parent.as_deref();
        }
        None
    }

    /// Nearest deployable entry (self included).
    pub fn deployable(&self) -> Option<&Entry> {
        self.ancestor_where(|e| e.entry_type.is_deployable())
    }

    /// The application this entry belongs to (self included).
    pub fn application(&self) -> Option<&Entry> {
        self.ancestor_where(|e| e.entry_type == EntryType::Application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, entry_type: EntryType, parent: Option<Entry>) -> Entry {
        Entry {
            path: PathBuf::from(name),
            entry_type,
            service_type: entry_type.service_type(),
            component_type: None,
            name: name.to_string(),
            kind: EntryKind::Directory,
            parent: parent.map(Box::new),
            sequence_number: 0,
        }
    }

    #[test]
    fn test_service_type_mapping() {
        assert_eq!(
            EntryType::from_service_type(ServiceType::Crud),
            EntryType::CrudService
        );
        assert_eq!(
            EntryType::from_service_type(ServiceType::Unknown),
            EntryType::Other
        );
        assert_eq!(EntryType::SqlService.service_type(), Some(ServiceType::Sql));
    }

    #[test]
    fn test_deployable_walks_parents() {
        let app = entry("app", EntryType::Application, None);
        let module = entry("mod", EntryType::Module, Some(app));
        let svc = entry("svc", EntryType::QueryService, Some(module));
        let tests = entry("tests", EntryType::TestsFolder, Some(svc));

        assert_eq!(tests.deployable().unwrap().name, "svc");
        assert_eq!(tests.application().unwrap().name, "app");
    }
}
