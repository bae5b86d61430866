//! KDL configuration parsing for devtime.
//!
//! This crate handles parsing of the workspace settings file (`devtime.kdl`).

pub mod error;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use settings::{SETTINGS_FILE, Settings, Timeouts, load_settings, parse_settings};
