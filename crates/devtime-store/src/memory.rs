//! In-memory descriptor store.

use async_trait::async_trait;
use devtime_core::store::{DescriptorStore, DirEntry};
use devtime_core::{EntryKind, Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// Descriptor store holding the whole tree in memory.
///
/// Directory listings come back in path order. Cloning shares the tree.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    nodes: BTreeMap<PathBuf, Node>,
    read_errors: BTreeSet<PathBuf>,
    rename_races: BTreeSet<PathBuf>,
}

impl Inner {
    fn add_dirs(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            self.nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    fn subtree(&self, root: &Path) -> Vec<(PathBuf, Node)> {
        self.nodes
            .range(root.to_path_buf()..)
            .take_while(|(path, _)| path.starts_with(root))
            .map(|(path, node)| (path.clone(), node.clone()))
            .collect()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a file synchronously, creating parent directories.
    pub fn insert_file(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let path = path.into();
        let mut inner = self.lock();
        if let Some(parent) = path.parent() {
            inner.add_dirs(parent);
        }
        inner.nodes.insert(path, Node::File(contents.into()));
    }

    /// Insert an empty directory synchronously.
    pub fn insert_dir(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.lock().add_dirs(&path);
    }

    /// Make every read of `path` fail with an IO error.
    pub fn set_read_error(&self, path: impl Into<PathBuf>) {
        self.lock().read_errors.insert(path.into());
    }

    /// Create `path` as a directory the moment something is renamed onto
    /// it, as if another writer got there first.
    pub fn occupy_on_rename(&self, path: impl Into<PathBuf>) {
        self.lock().rename_races.insert(path.into());
    }

    /// Every path in the store with its file contents (`None` for directories).
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
        self.lock()
            .nodes
            .iter()
            .map(|(path, node)| {
                let contents = match node {
                    Node::File(bytes) => Some(bytes.clone()),
                    Node::Dir => None,
                };
                (path.clone(), contents)
            })
            .collect()
    }

    /// File contents as UTF-8, for assertions.
    pub fn file_text(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.lock().nodes.get(path.as_ref()) {
            Some(Node::File(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}

#[async_trait]
impl DescriptorStore for MemoryStore {
    async fn read_dir(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let inner = self.lock();
        match inner.nodes.get(dir) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(Error::InvalidInput(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
            None => return Err(Error::NotFound(dir.display().to_string())),
        }
        Ok(inner
            .nodes
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, node)| DirEntry {
                path: path.clone(),
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                kind: match node {
                    Node::File(_) => EntryKind::File,
                    Node::Dir => EntryKind::Directory,
                },
            })
            .collect())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let inner = self.lock();
        if inner.read_errors.contains(path) {
            return Err(Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected read error"),
            ));
        }
        match inner.nodes.get(path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Dir) => Err(Error::InvalidInput(format!(
                "{} is a directory",
                path.display()
            ))),
            None => Err(Error::NotFound(path.display().to_string())),
        }
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if let Some(Node::Dir) = inner.nodes.get(path) {
            return Err(Error::InvalidInput(format!(
                "{} is a directory",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            inner.add_dirs(parent);
        }
        inner
            .nodes
            .insert(path.to_path_buf(), Node::File(contents.to_vec()));
        Ok(())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.lock().nodes.contains_key(path))
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        Ok(matches!(self.lock().nodes.get(path), Some(Node::Dir)))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let mut inner = self.lock();
        inner.nodes.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut inner = self.lock();
        if !inner.nodes.contains_key(from) {
            return Err(Error::NotFound(from.display().to_string()));
        }
        if inner.rename_races.remove(to) {
            inner.add_dirs(to);
        }
        if inner.nodes.contains_key(to) {
            return Err(Error::MoveConflict(to.to_path_buf()));
        }
        let moved = inner.subtree(from);
        inner.nodes.retain(|p, _| !p.starts_with(from));
        if let Some(parent) = to.parent() {
            inner.add_dirs(parent);
        }
        for (path, node) in moved {
            let relative = path.strip_prefix(from).unwrap_or(Path::new(""));
            inner.nodes.insert(to.join(relative), node);
        }
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let mut inner = self.lock();
        if !inner.nodes.contains_key(from) {
            return Err(Error::NotFound(from.display().to_string()));
        }
        let copied = inner.subtree(from);
        if let Some(parent) = to.parent() {
            inner.add_dirs(parent);
        }
        for (path, node) in copied {
            let relative = path.strip_prefix(from).unwrap_or(Path::new(""));
            inner.nodes.insert(to.join(relative), node);
        }
        Ok(())
    }

    async fn create_dir_all(&self, dir: &Path) -> Result<()> {
        let mut inner = self.lock();
        if let Some(Node::File(_)) = inner.nodes.get(dir) {
            return Err(Error::InvalidInput(format!("{} is a file", dir.display())));
        }
        inner.add_dirs(dir);
        Ok(())
    }
}
