//! Zip packaging of project subtrees for deploy uploads.

use async_trait::async_trait;
use bytes::Bytes;
use devtime_core::remote::Packager;
use devtime_core::{Error, Result};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

/// Packs a subtree of the local file system into a deflated zip archive.
#[derive(Debug, Clone, Default)]
pub struct ZipPackager;

impl ZipPackager {
    pub fn new() -> Self {
        Self
    }
}

fn zip_error(root: &Path, step: &str, e: impl std::fmt::Display) -> Error {
    Error::Internal(format!("packaging {} - {}: {}", root.display(), step, e))
}

fn create_zip_from_dir(root: &Path) -> Result<Vec<u8>> {
    let mut zip_writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| zip_error(root, "walking directory", e))?;
        let path = entry.path();
        let relative_path = path
            .strip_prefix(root)
            .map_err(|e| zip_error(root, "resolving relative path", e))?;

        if relative_path.as_os_str().is_empty() {
            continue;
        }

        // zip entries always use forward slashes
        let entry_name = relative_path.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            zip_writer
                .add_directory(format!("{}/", entry_name), options)
                .map_err(|e| zip_error(root, "adding directory", e))?;
        } else {
            zip_writer
                .start_file(entry_name, options)
                .map_err(|e| zip_error(root, "adding file", e))?;
            let contents = std::fs::read(path).map_err(|e| Error::io(path, e))?;
            zip_writer
                .write_all(&contents)
                .map_err(|e| zip_error(root, "writing file", e))?;
        }
    }

    let cursor = zip_writer
        .finish()
        .map_err(|e| zip_error(root, "finishing archive", e))?;
    Ok(cursor.into_inner())
}

#[async_trait]
impl Packager for ZipPackager {
    async fn package(&self, root: &Path) -> Result<Bytes> {
        let root: PathBuf = root.to_path_buf();
        if !tokio::fs::try_exists(&root)
            .await
            .map_err(|e| Error::io(&root, e))?
        {
            return Err(Error::NotFound(root.display().to_string()));
        }
        let bytes = tokio::task::spawn_blocking(move || create_zip_from_dir(&root))
            .await
            .map_err(|e| Error::Internal(format!("packaging task failed: {}", e)))??;
        Ok(Bytes::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[tokio::test]
    async fn test_package_service_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let svc = dir.path().join("svc");
        std::fs::create_dir_all(svc.join("tests")).unwrap();
        std::fs::write(svc.join("service.json"), r#"{"name":"svc","type":"query"}"#).unwrap();
        std::fs::write(svc.join("query.sql"), "select 1").unwrap();

        let bytes = ZipPackager::new().package(&svc).await.unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["query.sql", "service.json", "tests/"]);

        let mut sql = String::new();
        archive
            .by_name("query.sql")
            .unwrap()
            .read_to_string(&mut sql)
            .unwrap();
        assert_eq!(sql, "select 1");
    }

    #[tokio::test]
    async fn test_package_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = ZipPackager::new()
            .package(&dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
