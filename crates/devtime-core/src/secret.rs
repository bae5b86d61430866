//! Secret storage abstraction.
//!
//! A [`SecretStore`] is an explicit capability: it is opened when the process
//! starts, scoped to the active workspace, and passed to every operation that
//! needs a secret. Nothing reads secrets from ambient state.

use async_trait::async_trait;

use crate::Result;

/// Key under which the backend session token is kept.
pub const SESSION_TOKEN_KEY: &str = "session.token";

/// Trait for secret storage backends.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Get a secret, or `None` when nothing is stored under the key.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set/replace a secret.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a secret. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys with a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
