//! Child listing over the descriptor store.

use devtime_core::descriptor::ServiceType;
use devtime_core::store::{read_json, DescriptorStore, DirEntry};
use devtime_core::{ComponentType, Entry, EntryKind, EntryType, Error, ResourceUri, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::classify::{classify, sequence_number, service_entry_type, Listing, Slot};
use crate::layout::{ProjectLayout, SERVICE_FILE};

/// The only part of `service.json` that classification looks at.
#[derive(Deserialize)]
struct ServiceKind {
    #[serde(rename = "type")]
    service_type: ServiceType,
}

/// Resource tree of one local workspace.
///
/// Holds no nodes of its own. Every call re-reads the store, so two
/// listings never share parent chains.
#[derive(Clone)]
pub struct ResourceTree {
    store: Arc<dyn DescriptorStore>,
    layout: ProjectLayout,
}

impl ResourceTree {
    pub fn new(store: Arc<dyn DescriptorStore>, layout: ProjectLayout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn store(&self) -> &Arc<dyn DescriptorStore> {
        &self.store
    }

    /// The workspace node. It is never returned as anyone's child.
    pub fn root_entry(&self) -> Entry {
        Entry {
            path: self.layout.root().to_path_buf(),
            entry_type: EntryType::Workspace,
            service_type: None,
            component_type: None,
            name: self.layout.workspace().to_string(),
            kind: EntryKind::Directory,
            parent: None,
            sequence_number: 0,
        }
    }

    /// Ordered children of `parent`, or the applications when `parent` is
    /// `None` or the workspace node.
    ///
    /// Descriptor read failures degrade the child to [`EntryType::Other`];
    /// only a failure to list `parent` itself is an error.
    pub async fn children(&self, parent: Option<&Entry>) -> Result<Vec<Entry>> {
        let parent = parent.filter(|p| p.entry_type != EntryType::Workspace);
        let (listing, dir) = match parent {
            None => (Listing::Workspace, self.layout.root().to_path_buf()),
            Some(entry) => {
                let listing = Listing::for_entry(entry.entry_type, entry.kind);
                let dir = match listing {
                    Listing::Application => ProjectLayout::application_src(&entry.path),
                    _ => entry.path.clone(),
                };
                (listing, dir)
            }
        };
        if listing == Listing::Leaf {
            return Ok(Vec::new());
        }

        let listed = self.store.read_dir(&dir).await?;
        let mut children = Vec::with_capacity(listed.len());
        for child in listed {
            if let Some(entry) = self.classify_child(listing, parent, child).await {
                children.push(entry);
            }
        }
        // Stable: equal sequence numbers keep discovery order.
        children.sort_by_key(|e| e.sequence_number);
        debug!(
            "listed {} children under {}",
            children.len(),
            dir.display()
        );
        Ok(children)
    }

    /// Parent of an entry; applications have none.
    pub fn parent(&self, entry: &Entry) -> Option<Entry> {
        entry.parent.as_deref().cloned()
    }

    /// Resolve a path to its entry by walking down from the applications.
    pub async fn find(&self, path: &Path) -> Result<Entry> {
        let mut current: Option<Entry> = None;
        loop {
            let children = self.children(current.as_ref()).await?;
            let next = children
                .into_iter()
                .find(|child| path.starts_with(&child.path));
            match next {
                Some(child) if child.path == path => return Ok(child),
                Some(child) => current = Some(child),
                None => return Err(Error::NotFound(path.display().to_string())),
            }
        }
    }

    /// Resolve a remote identity to the local entry that owns it.
    pub async fn find_uri(&self, uri: &ResourceUri) -> Result<Entry> {
        self.find(&self.layout.path_of(uri)).await
    }

    /// Remote identity of a deployable entry.
    pub fn uri_of(&self, entry: &Entry) -> Result<ResourceUri> {
        self.layout.resource_uri(&entry.path)
    }

    async fn classify_child(
        &self,
        listing: Listing,
        parent: Option<&Entry>,
        child: DirEntry,
    ) -> Option<Entry> {
        let entry_type = match classify(listing, &child.name, child.kind) {
            Slot::Hidden => return None,
            Slot::Typed(entry_type) => entry_type,
            Slot::Application => {
                if !self.is_application(&child.path).await {
                    return None;
                }
                EntryType::Application
            }
            Slot::Service => self.service_type_of(&child.path).await,
        };

        let service_type = entry_type
            .service_type()
            .or_else(|| parent.and_then(|p| p.service_type));
        Some(Entry {
            path: child.path,
            entry_type,
            service_type,
            component_type: ComponentType::from_entry_type(entry_type),
            name: child.name,
            kind: child.kind,
            parent: parent.cloned().map(Box::new),
            sequence_number: sequence_number(listing, entry_type),
        })
    }

    async fn is_application(&self, dir: &Path) -> bool {
        let descriptor = ProjectLayout::application_descriptor(dir);
        match self.store.exists(&descriptor).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("cannot probe {}: {}", descriptor.display(), e);
                false
            }
        }
    }

    /// Entry type of a module child directory, read from its `service.json`.
    async fn service_type_of(&self, dir: &Path) -> EntryType {
        let descriptor = dir.join(SERVICE_FILE);
        match read_json::<ServiceKind>(self.store.as_ref(), &descriptor).await {
            Ok(service) if service.service_type == ServiceType::Unknown => {
                warn!(
                    "{} has an unknown service type, showing it unclassified",
                    descriptor.display()
                );
                EntryType::Other
            }
            Ok(service) => service_entry_type(service.service_type),
            Err(e) => {
                warn!(
                    "cannot classify {}: {}, showing it unclassified",
                    dir.display(),
                    e
                );
                EntryType::Other
            }
        }
    }
}
