//! Local mirror of the remotely deployed graph.
//!
//! The mirror lives under `.devtime/` in the workspace and is disposable:
//! every refresh replaces its slice wholesale, and validity is only ever
//! copied from the backend.

pub mod paths;
pub mod reader;
pub mod script;
pub mod sync;

pub use paths::MirrorLayout;
pub use reader::MirrorTree;
pub use script::render_test_script;
pub use sync::Synchronizer;
