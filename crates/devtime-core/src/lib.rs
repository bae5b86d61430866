//! Core domain types and traits for the devtime project model.
//!
//! This crate contains:
//! - Local tree nodes (entries) and mirror nodes (items)
//! - Descriptor file shapes
//! - Remote resource identifiers
//! - The error taxonomy
//! - Collaborator traits (descriptor store, secret store, deployment API, packager)

pub mod descriptor;
pub mod entry;
pub mod error;
pub mod item;
pub mod remote;
pub mod secret;
pub mod store;
pub mod uri;

pub use entry::{ComponentType, Entry, EntryKind, EntryType};
pub use error::{Error, RenameStage, Result};
pub use item::{Item, ItemType};
pub use uri::{ResourceLevel, ResourceUri};
