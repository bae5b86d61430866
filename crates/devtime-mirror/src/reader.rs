//! Item tree read back from the mirror folder.

use devtime_core::descriptor::{DataSource, Module};
use devtime_core::remote::{ApplicationSummary, ServiceSummary};
use devtime_core::store::{read_json, DescriptorStore};
use devtime_core::{EntryKind, Error, Item, ItemType, ResourceUri, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::paths::{MirrorLayout, APPLICATION_RECORD, MODULE_RECORD, SERVICE_RECORD};

/// Remote truth as last synchronized, without a network call.
#[derive(Clone)]
pub struct MirrorTree {
    store: Arc<dyn DescriptorStore>,
    layout: MirrorLayout,
}

impl MirrorTree {
    pub fn new(store: Arc<dyn DescriptorStore>, layout: MirrorLayout) -> Self {
        Self { store, layout }
    }

    /// Applications when `parent` is `None`, then modules, then services.
    /// A mirror that was never synchronized is empty.
    pub async fn children(&self, parent: Option<&Item>) -> Result<Vec<Item>> {
        let (folder, record) = match parent.map(|p| p.item_type) {
            None => (self.layout.applications(), APPLICATION_RECORD),
            Some(ItemType::Application) => (parent_folder(parent), MODULE_RECORD),
            Some(ItemType::Module) => (parent_folder(parent), SERVICE_RECORD),
            Some(_) => return Ok(Vec::new()),
        };
        if !self.store.is_dir(&folder).await? {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for child in self.store.read_dir(&folder).await? {
            if child.kind != EntryKind::Directory {
                continue;
            }
            let path = child.path.join(record);
            let read = self.read_item(&path, record, &child.name).await;
            items.push(Item {
                parent: parent.cloned().map(Box::new),
                ..read
            });
        }
        Ok(items)
    }

    /// Mirrored data sources, by name.
    pub async fn data_sources(&self) -> Result<Vec<Item>> {
        let folder = self.layout.data_sources();
        if !self.store.is_dir(&folder).await? {
            return Ok(Vec::new());
        }
        let mut items = Vec::new();
        for child in self.store.read_dir(&folder).await? {
            if child.kind != EntryKind::File {
                continue;
            }
            let read = read_json::<DataSource>(self.store.as_ref(), &child.path).await;
            let item = match read {
                Ok(data_source) => Item {
                    remote_uri: data_source.uri.unwrap_or_else(|| child.name.clone()),
                    item_type: ItemType::DataSource,
                    name: child.name,
                    state: None,
                    reason: None,
                    file_path: child.path,
                    parent: None,
                },
                Err(e) => degraded(&child.path, &child.name, e),
            };
            items.push(item);
        }
        Ok(items)
    }

    /// Mirrored item of a remote identity.
    pub async fn find(&self, uri: &ResourceUri) -> Result<Item> {
        let mut current: Option<Item> = None;
        for segment in uri.segments() {
            let next = self
                .children(current.as_ref())
                .await?
                .into_iter()
                .find(|item| item.folder().file_name() == Some(OsStr::new(segment)));
            current = Some(next.ok_or_else(|| {
                Error::NotFound(format!("{} is not in the deployment mirror", uri))
            })?);
        }
        current.ok_or_else(|| Error::NotFound(uri.to_string()))
    }

    async fn read_item(&self, path: &Path, record: &str, folder_name: &str) -> Item {
        let store = self.store.as_ref();
        let read = match record {
            APPLICATION_RECORD => read_json::<ApplicationSummary>(store, path)
                .await
                .map(|a| item(a.uri, ItemType::Application, a.name, None, None, path)),
            MODULE_RECORD => read_json::<Module>(store, path).await.map(|m| {
                let uri = m.uri.unwrap_or_default();
                item(uri, ItemType::Module, m.name, None, None, path)
            }),
            _ => read_json::<ServiceSummary>(store, path).await.map(|s| {
                let item_type = ItemType::from_service_type(s.service_type);
                item(s.uri, item_type, s.name, s.state, s.reason, path)
            }),
        };
        read.unwrap_or_else(|e| degraded(path, folder_name, e))
    }
}

fn parent_folder(parent: Option<&Item>) -> PathBuf {
    parent.map(Item::folder).unwrap_or_default()
}

fn item(
    remote_uri: String,
    item_type: ItemType,
    name: String,
    state: Option<String>,
    reason: Option<String>,
    path: &Path,
) -> Item {
    Item {
        remote_uri,
        item_type,
        name,
        state,
        reason,
        file_path: path.to_path_buf(),
        parent: None,
    }
}

fn degraded(path: &Path, name: &str, e: Error) -> Item {
    warn!("unreadable mirror record {}: {}", path.display(), e);
    item(String::new(), ItemType::Other, name.to_string(), None, None, path)
}
