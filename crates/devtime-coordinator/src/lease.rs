//! Per-application leases.
//!
//! Cascades that touch the same application take turns; cascades on
//! different applications still interleave.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Held for the duration of one cascade.
pub type Lease = OwnedMutexGuard<()>;

#[derive(Default, Clone)]
pub struct Leases {
    slots: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

impl Leases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lease of the application at `app_dir`.
    pub async fn acquire(&self, app_dir: &Path) -> Lease {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .entry(app_dir.to_path_buf())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        debug!(app = %app_dir.display(), "waiting for lease");
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_application_serializes() {
        let leases = Leases::new();
        let held = leases.acquire(Path::new("/ws/shop")).await;

        let waiting = tokio::time::timeout(
            Duration::from_millis(50),
            leases.acquire(Path::new("/ws/shop")),
        )
        .await;
        assert!(waiting.is_err());

        drop(held);
        let _again = leases.acquire(Path::new("/ws/shop")).await;
    }

    #[tokio::test]
    async fn test_other_application_is_free() {
        let leases = Leases::new();
        let _shop = leases.acquire(Path::new("/ws/shop")).await;
        let blog = tokio::time::timeout(
            Duration::from_millis(50),
            leases.acquire(Path::new("/ws/blog")),
        )
        .await;
        assert!(blog.is_ok());
    }
}
