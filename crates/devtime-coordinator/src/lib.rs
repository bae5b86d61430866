//! Multi-step operations over a devtime project.
//!
//! Every operation that touches both the local tree and the backend goes
//! through [`Coordinator`]. Operations on the same application are
//! serialized by a per-application lease.

pub mod coordinator;
pub mod datasource;
pub mod deploy;
pub mod events;
pub mod lease;
pub mod names;
pub mod rename;
pub mod scaffold;

#[cfg(test)]
mod testing;

pub use coordinator::Coordinator;
pub use events::TreeEvent;
pub use names::validate_name;
pub use rename::RenameOutcome;
