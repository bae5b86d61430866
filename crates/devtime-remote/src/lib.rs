//! Deployment backend clients for devtime.
//!
//! Provides the HTTP implementation of the remote deployment API and an
//! in-memory backend that records every call.

pub mod http;
pub mod memory;

pub use devtime_core::remote::{
    ApplicationAggregate, ApplicationSummary, DeployOutcome, DeploymentApi, ModuleAggregate,
    ServiceSummary, TestCase,
};
pub use http::HttpDeploymentApi;
pub use memory::{Call, Failure, MemoryDeploymentApi};
