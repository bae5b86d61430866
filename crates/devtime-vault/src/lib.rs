//! Credential vault for data source passwords.
//!
//! Once a data source has been used successfully, its `datasource.json` holds
//! [`MASK`] instead of the password and the real value lives in the
//! [`SecretStore`](devtime_core::secret::SecretStore), keyed by the
//! descriptor's path within the workspace.

pub mod vault;

pub use vault::{CredentialVault, MASK};
