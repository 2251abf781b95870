//! Core engine for Robant note hierarchies.
//! This crate is the single source of truth for schema, validation and
//! index invariants.

pub mod cancel;
pub mod config;
pub mod index;
pub mod integration;
pub mod loader;
pub mod logging;
pub mod model;
pub mod query;
pub mod schema;
pub mod service;
pub mod validate;

pub use cancel::{CancelToken, CycleLimits, Interruption};
pub use config::{load_config, ConfigError, RobantConfig, CONFIG_FILE_NAME};
pub use index::{build, BuildOutcome, Index, IndexBuilder, IndexHandle, IndexSnapshot};
pub use integration::{
    AdapterError, AdapterRegistry, AdapterRegistryError, ExportPayload, ImportRequest,
    IntegrationAdapter, IntegrationIssue, IntegrationIssueKind, Signal,
};
pub use loader::{load, load_with_limits, LoadError, LoadedEntry, NoteStream};
pub use logging::{init_logging, logging_status, DEFAULT_LOG_LEVEL};
pub use model::note::{Note, NoteId, NoteKind, NoteOrigin, ParsedNote, RawNote, ResourceEntry};
pub use model::status::{IllegalTransition, Priority, TaskStatus};
pub use model::value::FieldValue;
pub use query::{
    ranked_tasks, recall_actions, recall_activity, search, select_next_task, subtasks,
    QueryError, SearchHit, SearchQuery, TaskSelection, TaskView, TimeRange,
};
pub use schema::{
    install_schema, installed_schema, reset_schema, FieldSpec, FieldType, SchemaError,
    SchemaRegistry,
};
pub use service::cycle_service::{CycleOutcome, CycleReport, LoadCycle};
pub use service::workspace_service::{WorkspaceError, WorkspaceService};
pub use validate::{Validation, ValidationError, ValidationErrorKind, Validator};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
