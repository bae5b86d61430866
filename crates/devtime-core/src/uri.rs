//! Remote resource identifiers.

use serde::{Deserialize, Serialize};

/// Fully-qualified identity of a deployable resource on the backend:
/// `workspace/app[/module[/service]]`.
///
/// Deploy and undeploy calls are always keyed by this, never by a display
/// name alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceUri {
    pub workspace: String,
    pub application: String,
    pub module: Option<String>,
    pub service: Option<String>,
}

/// Level of a resource in the deployable hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLevel {
    Application,
    Module,
    Service,
}

impl ResourceUri {
    pub fn application(workspace: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            application: application.into(),
            module: None,
            service: None,
        }
    }

    pub fn module(&self, module: impl Into<String>) -> Self {
        Self {
            workspace: self.workspace.clone(),
            application: self.application.clone(),
            module: Some(module.into()),
            service: None,
        }
    }

    /// Service URI under this module URI.
    ///
    /// Called on an application URI this yields a URI with no module, which
    /// is never a valid service identity; callers build module URIs first.
    pub fn service(&self, service: impl Into<String>) -> Self {
        Self {
            workspace: self.workspace.clone(),
            application: self.application.clone(),
            module: self.module.clone(),
            service: Some(service.into()),
        }
    }

    pub fn level(&self) -> ResourceLevel {
        match (&self.module, &self.service) {
            (_, Some(_)) => ResourceLevel::Service,
            (Some(_), None) => ResourceLevel::Module,
            (None, None) => ResourceLevel::Application,
        }
    }

    /// The last segment of the URI.
    pub fn name(&self) -> &str {
        self.service
            .as_deref()
            .or(self.module.as_deref())
            .unwrap_or(&self.application)
    }

    /// Path segments after the workspace.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = vec![self.application.as_str()];
        segments.extend(self.module.as_deref());
        segments.extend(self.service.as_deref());
        segments
    }
}

impl std::fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.workspace)?;
        for segment in self.segments() {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ResourceUri {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
            return Err(crate::Error::InvalidInput(format!(
                "invalid segment in resource uri: {}",
                s
            )));
        }
        match parts.as_slice() {
            [ws, app] => Ok(Self::application(*ws, *app)),
            [ws, app, module] => Ok(Self::application(*ws, *app).module(*module)),
            [ws, app, module, service] => {
                Ok(Self::application(*ws, *app).module(*module).service(*service))
            }
            _ => Err(crate::Error::InvalidInput(format!(
                "expected workspace/app[/module[/service]], got: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_service_uri() {
        let uri = ResourceUri::application("ws", "app").module("mod").service("svc");
        assert_eq!(uri.to_string(), "ws/app/mod/svc");
        assert_eq!(uri.level(), ResourceLevel::Service);
        assert_eq!(uri.name(), "svc");
    }

    #[test]
    fn test_parse_module_uri() {
        let uri: ResourceUri = "ws/app/mod".parse().unwrap();
        assert_eq!(uri.level(), ResourceLevel::Module);
        assert_eq!(uri.module.as_deref(), Some("mod"));
        assert_eq!(uri.to_string(), "ws/app/mod");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!("ws".parse::<ResourceUri>().is_err());
        assert!("ws//mod".parse::<ResourceUri>().is_err());
        assert!("ws/../etc".parse::<ResourceUri>().is_err());
        assert!("ws/a/b/c/d".parse::<ResourceUri>().is_err());
    }
}
