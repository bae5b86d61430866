//! Mirror folder layout.
//!
//! ```text
//! .devtime/applications/<app>/application
//! .devtime/applications/<app>/<module>/module
//! .devtime/applications/<app>/<module>/<service>/service
//! .devtime/applications/<app>/<module>/<service>/tests.http
//! .devtime/datasources/<name>
//! ```

use devtime_core::{Error, ResourceUri, Result};
use devtime_tree::ProjectLayout;
use std::path::{Path, PathBuf};

pub const APPLICATIONS_DIR: &str = "applications";
pub const DATASOURCES_DIR: &str = "datasources";
pub const APPLICATION_RECORD: &str = "application";
pub const MODULE_RECORD: &str = "module";
pub const SERVICE_RECORD: &str = "service";
pub const TESTS_SCRIPT: &str = "tests.http";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorLayout {
    root: PathBuf,
}

impl MirrorLayout {
    pub fn new(project: &ProjectLayout) -> Self {
        Self {
            root: project.devtime_dir(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn applications(&self) -> PathBuf {
        self.root.join(APPLICATIONS_DIR)
    }

    pub fn data_sources(&self) -> PathBuf {
        self.root.join(DATASOURCES_DIR)
    }

    /// Folder of an application, module or service.
    pub fn folder(&self, uri: &ResourceUri) -> PathBuf {
        let mut folder = self.applications();
        for segment in uri.segments() {
            folder.push(segment);
        }
        folder
    }

    /// Descriptor record of an application, module or service.
    pub fn record(&self, uri: &ResourceUri) -> PathBuf {
        let name = match uri.level() {
            devtime_core::ResourceLevel::Application => APPLICATION_RECORD,
            devtime_core::ResourceLevel::Module => MODULE_RECORD,
            devtime_core::ResourceLevel::Service => SERVICE_RECORD,
        };
        self.folder(uri).join(name)
    }

    pub fn data_source(&self, name: &str) -> Result<PathBuf> {
        Ok(self.data_sources().join(checked_segment(name)?))
    }

    pub fn tests_script(&self, service: &ResourceUri) -> PathBuf {
        self.folder(service).join(TESTS_SCRIPT)
    }
}

/// A remote name usable as a single folder name.
pub fn checked_segment(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::InvalidInput(format!(
            "remote name cannot be used as a folder name: {:?}",
            name
        )));
    }
    Ok(name)
}
