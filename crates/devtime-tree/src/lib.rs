//! Resource tree model for devtime projects.
//!
//! The tree is a pure projection of the descriptor store at query time:
//! every listing classifies and orders children afresh, nothing is cached.

pub mod classify;
pub mod layout;
pub mod tree;

pub use layout::ProjectLayout;
pub use tree::ResourceTree;
