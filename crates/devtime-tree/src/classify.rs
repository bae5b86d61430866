//! Classification and ordering tables.
//!
//! Children are typed from their reserved name first; service directories
//! need their descriptor read, which the tree does after the name lookup
//! returns [`Slot::Service`].

use devtime_core::descriptor::ServiceType;
use devtime_core::{EntryKind, EntryType};

use crate::layout::{
    APPLICATION_FILE, COLUMNS_SUFFIX, DATASOURCE_FILE, INPUT_BINDINGS_FILE, INPUT_FILE,
    MODULE_FILE, OBJECT_FILE, OUTPUT_BINDINGS_FILE, OUTPUT_FILE, QUERY_FILE, READ_DIR,
    SERVICE_FILE, SQLS_FILE, TABLES_FILE, TESTS_DIR, WRITE_DIR,
};

/// Sequence number of anything the tables do not recognise.
pub const OTHER_SEQUENCE: u32 = 10_000;
/// Sequence number of a `tests/` folder.
pub const TESTS_SEQUENCE: u32 = 1_000;
/// Sequence number of applications, modules and services among their siblings.
pub const CONTAINER_SEQUENCE: u32 = 100;

/// How the children of a node are listed, chosen from the node's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Workspace,
    Application,
    Module,
    /// Query and sql services share one layout.
    Service,
    CrudService,
    ReadBlock,
    WriteBlock,
    TestsFolder,
    Generic,
    /// Files have no children.
    Leaf,
}

impl Listing {
    pub fn for_entry(entry_type: EntryType, kind: EntryKind) -> Self {
        if kind == EntryKind::File {
            return Listing::Leaf;
        }
        match entry_type {
            EntryType::Workspace => Listing::Workspace,
            EntryType::Application => Listing::Application,
            EntryType::Module => Listing::Module,
            EntryType::QueryService | EntryType::SqlService => Listing::Service,
            EntryType::CrudService => Listing::CrudService,
            EntryType::ReadBlock => Listing::ReadBlock,
            EntryType::WriteBlock => Listing::WriteBlock,
            EntryType::TestsFolder => Listing::TestsFolder,
            EntryType::ApplicationDescriptor
            | EntryType::DataSource
            | EntryType::ModuleDescriptor
            | EntryType::ServiceDescriptor
            | EntryType::Input
            | EntryType::Output
            | EntryType::Query
            | EntryType::Sqls
            | EntryType::InputBindings
            | EntryType::OutputBindings
            | EntryType::Object
            | EntryType::Tables
            | EntryType::Columns
            | EntryType::Test
            | EntryType::Other => Listing::Generic,
        }
    }
}

/// Outcome of the reserved-name lookup for one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Typed(EntryType),
    /// A directory that is an application if it holds `src/application.json`.
    Application,
    /// A directory whose type comes from its `service.json`.
    Service,
    /// Not shown at all.
    Hidden,
}

/// Type a child by name and kind under the given listing.
pub fn classify(listing: Listing, name: &str, kind: EntryKind) -> Slot {
    use EntryKind::{Directory, File};

    let typed = |entry_type| Slot::Typed(entry_type);
    match listing {
        Listing::Workspace => match kind {
            Directory if !name.starts_with('.') => Slot::Application,
            _ => Slot::Hidden,
        },
        Listing::Application => match (name, kind) {
            (APPLICATION_FILE, File) => typed(EntryType::ApplicationDescriptor),
            (DATASOURCE_FILE, File) => typed(EntryType::DataSource),
            (_, Directory) => typed(EntryType::Module),
            _ => typed(EntryType::Other),
        },
        Listing::Module => match (name, kind) {
            (MODULE_FILE, File) => typed(EntryType::ModuleDescriptor),
            (_, Directory) => Slot::Service,
            _ => typed(EntryType::Other),
        },
        Listing::Service => match (name, kind) {
            (SERVICE_FILE, File) => typed(EntryType::ServiceDescriptor),
            (INPUT_FILE, File) => typed(EntryType::Input),
            (OUTPUT_FILE, File) => typed(EntryType::Output),
            (SQLS_FILE, File) => typed(EntryType::Sqls),
            (QUERY_FILE, File) => typed(EntryType::Query),
            (INPUT_BINDINGS_FILE, File) => typed(EntryType::InputBindings),
            (OUTPUT_BINDINGS_FILE, File) => typed(EntryType::OutputBindings),
            (TESTS_DIR, Directory) => typed(EntryType::TestsFolder),
            _ => typed(EntryType::Other),
        },
        Listing::CrudService => match (name, kind) {
            (SERVICE_FILE, File) => typed(EntryType::ServiceDescriptor),
            (OBJECT_FILE, File) => typed(EntryType::Object),
            (READ_DIR, Directory) => typed(EntryType::ReadBlock),
            (WRITE_DIR, Directory) => typed(EntryType::WriteBlock),
            (TESTS_DIR, Directory) => typed(EntryType::TestsFolder),
            _ => typed(EntryType::Other),
        },
        Listing::ReadBlock => match (name, kind) {
            (INPUT_FILE, File) => typed(EntryType::Input),
            (QUERY_FILE, File) => typed(EntryType::Query),
            (INPUT_BINDINGS_FILE, File) => typed(EntryType::InputBindings),
            (OUTPUT_BINDINGS_FILE, File) => typed(EntryType::OutputBindings),
            _ => typed(EntryType::Other),
        },
        Listing::WriteBlock => match (name, kind) {
            (TABLES_FILE, File) => typed(EntryType::Tables),
            (n, File) if n.ends_with(COLUMNS_SUFFIX) && n.len() > COLUMNS_SUFFIX.len() => {
                typed(EntryType::Columns)
            }
            _ => typed(EntryType::Other),
        },
        Listing::TestsFolder => match kind {
            File => typed(EntryType::Test),
            Directory => typed(EntryType::Other),
        },
        Listing::Generic => typed(EntryType::Other),
        Listing::Leaf => Slot::Hidden,
    }
}

/// Map a service descriptor's type to the entry type of its directory.
pub fn service_entry_type(service_type: ServiceType) -> EntryType {
    EntryType::from_service_type(service_type)
}

/// Ordering key of a child of the given type under the given listing.
pub fn sequence_number(listing: Listing, entry_type: EntryType) -> u32 {
    match listing {
        Listing::Workspace => match entry_type {
            EntryType::Application => CONTAINER_SEQUENCE,
            _ => OTHER_SEQUENCE,
        },
        Listing::Application => match entry_type {
            EntryType::ApplicationDescriptor => 0,
            EntryType::DataSource => 1,
            EntryType::Module => CONTAINER_SEQUENCE,
            _ => OTHER_SEQUENCE,
        },
        Listing::Module => match entry_type {
            EntryType::ModuleDescriptor => 0,
            EntryType::QueryService | EntryType::SqlService | EntryType::CrudService => {
                CONTAINER_SEQUENCE
            }
            _ => OTHER_SEQUENCE,
        },
        Listing::Service => match entry_type {
            EntryType::ServiceDescriptor => 0,
            EntryType::Input => 1,
            EntryType::Output => 2,
            EntryType::Sqls => 3,
            EntryType::Query => 4,
            EntryType::InputBindings => 5,
            EntryType::OutputBindings => 6,
            EntryType::TestsFolder => TESTS_SEQUENCE,
            _ => OTHER_SEQUENCE,
        },
        Listing::CrudService => match entry_type {
            EntryType::ServiceDescriptor => 0,
            EntryType::Object => 1,
            EntryType::ReadBlock => 2,
            EntryType::WriteBlock => 3,
            EntryType::TestsFolder => TESTS_SEQUENCE,
            _ => OTHER_SEQUENCE,
        },
        Listing::ReadBlock => match entry_type {
            EntryType::Input => 1,
            EntryType::Query => 2,
            EntryType::InputBindings => 3,
            EntryType::OutputBindings => 4,
            _ => OTHER_SEQUENCE,
        },
        Listing::WriteBlock => match entry_type {
            EntryType::Tables => 0,
            EntryType::Columns => 1,
            _ => OTHER_SEQUENCE,
        },
        Listing::TestsFolder => match entry_type {
            EntryType::Test => 0,
            _ => OTHER_SEQUENCE,
        },
        Listing::Generic | Listing::Leaf => OTHER_SEQUENCE,
    }
}
