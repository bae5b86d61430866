//! Descriptor store abstraction.
//!
//! The project model never touches the file system directly; every read and
//! mutation goes through a [`DescriptorStore`].

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::entry::EntryKind;
use crate::{Error, Result};

/// One child of a directory as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub kind: EntryKind,
}

/// Trait for descriptor storage backends.
#[async_trait]
pub trait DescriptorStore: Send + Sync {
    /// List the children of a directory, in the order the backend reports them.
    async fn read_dir(&self, dir: &Path) -> Result<Vec<DirEntry>>;

    /// Read a file's full contents.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write a file, creating missing parent directories.
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Whether anything exists at the path.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Whether the path is an existing directory.
    async fn is_dir(&self, path: &Path) -> Result<bool>;

    /// Delete a file, or a directory recursively. Missing paths are not an error.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Move a file or directory. Fails with [`Error::MoveConflict`] if the
    /// target already exists.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Copy a file, or a directory recursively.
    async fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Create a directory and any missing parents.
    async fn create_dir_all(&self, dir: &Path) -> Result<()>;
}

/// Read and parse a JSON descriptor.
pub async fn read_json<T: DeserializeOwned>(store: &dyn DescriptorStore, path: &Path) -> Result<T> {
    let bytes = store.read(path).await?;
    serde_json::from_slice(&bytes).map_err(|source| Error::Serialization {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize and write a JSON descriptor (pretty-printed, trailing newline).
pub async fn write_json<T: Serialize + Sync>(
    store: &dyn DescriptorStore,
    path: &Path,
    value: &T,
) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| Error::Serialization {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    store.write(path, &bytes).await
}

/// Overwrite the `name` field of a JSON descriptor, keeping every other field.
pub async fn update_name(store: &dyn DescriptorStore, path: &Path, name: &str) -> Result<()> {
    update_field(store, path, "name", name).await
}

/// Overwrite one string field of a JSON descriptor, keeping every other field.
pub async fn update_field(
    store: &dyn DescriptorStore,
    path: &Path,
    field: &str,
    value: &str,
) -> Result<()> {
    let mut descriptor: serde_json::Value = read_json(store, path).await?;
    let object = descriptor.as_object_mut().ok_or_else(|| {
        Error::InvalidInput(format!("{} is not a JSON object", path.display()))
    })?;
    object.insert(
        field.to_string(),
        serde_json::Value::String(value.to_string()),
    );
    write_json(store, path, &descriptor).await
}
