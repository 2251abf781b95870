//! Integration adapter interface for external workflow systems.

pub mod adapter;
pub mod registry;

pub use adapter::{
    AdapterError, AdapterResult, AdapterStage, ExportPayload, ImportRequest, IntegrationAdapter,
    Signal, INTEGRATION_ROOT,
};
pub use registry::{
    AdapterRegistry, AdapterRegistryError, ImportOutcome, IntegrationIssue, IntegrationIssueKind,
};
