//! Storage backends for devtime.
//!
//! Provides implementations of the core collaborator traits:
//! - Local file system descriptor store (production)
//! - In-memory descriptor store (tests, dry runs)
//! - File-backed and in-memory secret stores
//! - Zip packager for deploy archives

pub mod local;
pub mod memory;
pub mod packager;
pub mod secret;

pub use devtime_core::store::{DescriptorStore, DirEntry};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use packager::ZipPackager;
pub use secret::{FileSecretStore, MemorySecretStore};
