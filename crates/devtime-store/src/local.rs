//! Local file system descriptor store.

use async_recursion::async_recursion;
use async_trait::async_trait;
use devtime_core::store::{DescriptorStore, DirEntry};
use devtime_core::{EntryKind, Error, Result};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

/// Descriptor store backed by the real file system through `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalStore;

impl LocalStore {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(path: &Path, err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::NotFound {
        Error::NotFound(path.display().to_string())
    } else {
        Error::io(path, err)
    }
}

#[async_recursion]
async fn copy_recursive(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from).await.map_err(|e| io_error(from, e))?;
    if !metadata.is_dir() {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        fs::copy(from, to).await.map_err(|e| io_error(from, e))?;
        return Ok(());
    }

    fs::create_dir_all(to).await.map_err(|e| Error::io(to, e))?;
    let mut entries = fs::read_dir(from).await.map_err(|e| io_error(from, e))?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(from, e))? {
        let target = to.join(entry.file_name());
        copy_recursive(&entry.path(), &target).await?;
    }
    Ok(())
}

#[async_trait]
impl DescriptorStore for LocalStore {
    async fn read_dir(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let mut reader = fs::read_dir(dir).await.map_err(|e| io_error(dir, e))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| Error::io(dir, e))? {
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                path: entry.path(),
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        Ok(entries)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).await.map_err(|e| io_error(path, e))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        fs::write(path, contents).await.map_err(|e| Error::io(path, e))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(|e| Error::io(path, e))
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let metadata = match fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::io(path, e)),
        };
        let result = if metadata.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };
        match result {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(Error::io(path, e)),
            _ => Ok(()),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if !self.exists(from).await? {
            return Err(Error::NotFound(from.display().to_string()));
        }
        if self.exists(to).await? {
            return Err(Error::MoveConflict(to.to_path_buf()));
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        fs::rename(from, to).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists | ErrorKind::DirectoryNotEmpty => {
                Error::MoveConflict(to.to_path_buf())
            }
            _ => io_error(from, e),
        })
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        copy_recursive(from, to).await
    }

    async fn create_dir_all(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).await.map_err(|e| Error::io(dir, e))
    }
}
