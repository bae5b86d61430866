//! Tree change notifications.

use std::path::PathBuf;

/// Sent after a cascade changes the local tree. Listeners re-list the
/// children of `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    Changed { parent: PathBuf },
    Renamed { from: PathBuf, to: PathBuf },
    Removed { path: PathBuf },
}
