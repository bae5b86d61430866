//! On-disk layout of a devtime project.
//!
//! ```text
//! <root>/<app>/src/application.json
//! <root>/<app>/src/datasource.json
//! <root>/<app>/src/<module>/module.json
//! <root>/<app>/src/<module>/<service>/service.json
//! ```

use devtime_core::{Entry, EntryType, Error, ResourceUri, Result};
use std::path::{Component, Path, PathBuf};

pub const SRC_DIR: &str = "src";
pub const APPLICATION_FILE: &str = "application.json";
pub const DATASOURCE_FILE: &str = "datasource.json";
pub const MODULE_FILE: &str = "module.json";
pub const SERVICE_FILE: &str = "service.json";
pub const INPUT_FILE: &str = "input.json";
pub const OUTPUT_FILE: &str = "output.json";
pub const QUERY_FILE: &str = "query.sql";
pub const SQLS_FILE: &str = "sqls.sql";
pub const INPUT_BINDINGS_FILE: &str = "input-bindings.json";
pub const OUTPUT_BINDINGS_FILE: &str = "output-bindings.json";
pub const OBJECT_FILE: &str = "object.json";
pub const TABLES_FILE: &str = "tables.json";
pub const COLUMNS_SUFFIX: &str = ".columns.json";
pub const READ_DIR: &str = "read";
pub const WRITE_DIR: &str = "write";
pub const TESTS_DIR: &str = "tests";
/// Local deployment mirror and other tool state.
pub const DEVTIME_DIR: &str = ".devtime";

/// Where a workspace lives and which remote workspace it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    workspace: String,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>, workspace: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            workspace: workspace.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn application_dir(&self, app: &str) -> PathBuf {
        self.root.join(app)
    }

    pub fn application_src(app_dir: &Path) -> PathBuf {
        app_dir.join(SRC_DIR)
    }

    pub fn application_descriptor(app_dir: &Path) -> PathBuf {
        app_dir.join(SRC_DIR).join(APPLICATION_FILE)
    }

    pub fn data_source_descriptor(app_dir: &Path) -> PathBuf {
        app_dir.join(SRC_DIR).join(DATASOURCE_FILE)
    }

    pub fn devtime_dir(&self) -> PathBuf {
        self.root.join(DEVTIME_DIR)
    }

    /// Path relative to the workspace root, with forward slashes.
    pub fn relative(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.root).map_err(|_| {
            Error::InvalidInput(format!(
                "{} is outside the workspace {}",
                path.display(),
                self.root.display()
            ))
        })?;
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Ok(parts.join("/"))
    }

    /// Remote identity of the application, module or service at `path`.
    pub fn resource_uri(&self, path: &Path) -> Result<ResourceUri> {
        let relative = self.relative(path)?;
        let parts: Vec<&str> = relative.split('/').filter(|p| !p.is_empty()).collect();
        match parts.as_slice() {
            [app] => Ok(ResourceUri::application(&self.workspace, *app)),
            [app, SRC_DIR, module] => Ok(ResourceUri::application(&self.workspace, *app).module(*module)),
            [app, SRC_DIR, module, service] => Ok(ResourceUri::application(&self.workspace, *app)
                .module(*module)
                .service(*service)),
            _ => Err(Error::InvalidInput(format!(
                "{} is not an application, module or service",
                path.display()
            ))),
        }
    }

    /// Local directory of a remote identity.
    pub fn path_of(&self, uri: &ResourceUri) -> PathBuf {
        let mut path = self.application_dir(&uri.application);
        if let Some(module) = &uri.module {
            path = path.join(SRC_DIR).join(module);
            if let Some(service) = &uri.service {
                path = path.join(service);
            }
        }
        path
    }
}

/// Own descriptor file of a deployable entry.
pub fn descriptor_of(entry: &Entry) -> Option<PathBuf> {
    descriptor_in(entry.entry_type, &entry.path)
}

/// Descriptor file of a deployable of the given type living at `dir`.
pub fn descriptor_in(entry_type: EntryType, dir: &Path) -> Option<PathBuf> {
    match entry_type {
        EntryType::Application => Some(ProjectLayout::application_descriptor(dir)),
        EntryType::Module => Some(dir.join(MODULE_FILE)),
        EntryType::QueryService | EntryType::SqlService | EntryType::CrudService => {
            Some(dir.join(SERVICE_FILE))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_uri_levels() {
        let layout = ProjectLayout::new("/projects/shop", "ws");
        assert_eq!(
            layout
                .resource_uri(Path::new("/projects/shop/app"))
                .unwrap()
                .to_string(),
            "ws/app"
        );
        assert_eq!(
            layout
                .resource_uri(Path::new("/projects/shop/app/src/mod/svc"))
                .unwrap()
                .to_string(),
            "ws/app/mod/svc"
        );
        assert!(layout
            .resource_uri(Path::new("/projects/shop/app/src"))
            .is_err());
        assert!(layout.resource_uri(Path::new("/elsewhere/app")).is_err());
    }

    #[test]
    fn test_path_of_round_trips() {
        let layout = ProjectLayout::new("/p", "ws");
        let uri = ResourceUri::application("ws", "app").module("m").service("s");
        let path = layout.path_of(&uri);
        assert_eq!(path, PathBuf::from("/p/app/src/m/s"));
        assert_eq!(layout.resource_uri(&path).unwrap(), uri);
    }

    #[test]
    fn test_relative_uses_forward_slashes() {
        let layout = ProjectLayout::new("/p", "ws");
        assert_eq!(
            layout
                .relative(Path::new("/p/app/src/datasource.json"))
                .unwrap(),
            "app/src/datasource.json"
        );
    }
}
