//! Integration adapter contract and wire types.
//!
//! # Responsibility
//! - Define the boundary external workflow systems implement.
//! - Convert imported signals into raw notes for the normal validation path.
//!
//! # Invariants
//! - Adapters are `Send + Sync`; imports run off the caller's thread.
//! - Signals never bypass validation.

use crate::cancel::CancelToken;
use crate::model::note::{Metadata, NoteId, NoteOrigin, RawNote};
use crate::model::status::TaskStatus;
use crate::query::TaskView;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

/// Path prefix under which imported signals appear.
pub const INTEGRATION_ROOT: &str = "integrations";

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Adapter operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterStage {
    Import,
    Export,
}

impl AdapterStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
        }
    }
}

/// Error envelope returned by adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterError {
    pub adapter_id: String,
    pub stage: AdapterStage,
    /// Stable machine-readable code, e.g. `auth_expired`.
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl AdapterError {
    pub fn new(
        adapter_id: impl Into<String>,
        stage: AdapterStage,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            stage,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "adapter `{}` failed during {} ({}): {}",
            self.adapter_id,
            self.stage.as_str(),
            self.code,
            self.message
        )
    }
}

impl Error for AdapterError {}

/// Bounds handed to one `import_signals` call.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    /// Tripped when the import is abandoned; adapters should check it.
    pub cancel: CancelToken,
    pub deadline: Option<Instant>,
    /// Only signals newer than this are needed, when set.
    pub since: Option<DateTime<Utc>>,
}

impl ImportRequest {
    /// Whether the adapter should stop working and return.
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// One externally imposed record.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Adapter-scoped identifier; becomes the last path component.
    pub signal_id: String,
    pub metadata: Metadata,
    pub body: String,
}

impl Signal {
    pub fn new(signal_id: impl Into<String>) -> Self {
        Self {
            signal_id: signal_id.into(),
            metadata: Metadata::new(),
            body: String::new(),
        }
    }

    /// Sets one metadata entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// An action signal recording that `task_id` moved to `to` at `at`.
    pub fn status_update(
        signal_id: impl Into<String>,
        task_id: impl Into<String>,
        to: TaskStatus,
        at: DateTime<Utc>,
    ) -> Self {
        let task_id: String = task_id.into();
        Self::new(signal_id)
            .with("kind", "action")
            .with("task", task_id)
            .with("at", at.to_rfc3339_opts(SecondsFormat::Secs, true))
            .with("to", to.as_str())
    }

    /// Records the status the external view saw before the update.
    pub fn from_status(self, from: TaskStatus) -> Self {
        self.with("from", from.as_str())
    }

    /// Identifier a signal gets when no `id` field overrides it.
    pub fn derived_id(adapter_id: &str, signal_id: &str) -> NoteId {
        format!("{INTEGRATION_ROOT}/{adapter_id}/{}", signal_id.trim_matches('/'))
    }

    /// Converts the signal into a raw note owned by `adapter_id`.
    pub fn into_raw_note(self, adapter_id: &str) -> RawNote {
        let derived_id = Self::derived_id(adapter_id, &self.signal_id);
        RawNote {
            path: PathBuf::from(&derived_id),
            derived_id,
            origin: NoteOrigin::Integration {
                adapter_id: adapter_id.to_string(),
            },
            metadata: self.metadata,
            body: self.body,
            modified: None,
        }
    }
}

/// Rendered selection produced by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub adapter_id: String,
    /// Media type or format name of `body`.
    pub format: String,
    pub body: String,
    pub task_ids: Vec<NoteId>,
}

/// Boundary implemented by each external workflow system.
pub trait IntegrationAdapter: Send + Sync {
    /// Stable id matching `[a-z0-9_-]+`.
    fn adapter_id(&self) -> &str;

    /// Fetches signals from the external system.
    ///
    /// Implementations should poll `request.should_stop()` during long work.
    fn import_signals(&self, request: &ImportRequest) -> AdapterResult<Vec<Signal>>;

    /// Renders `tasks` for the external system.
    fn export_selection(&self, tasks: &[TaskView]) -> AdapterResult<ExportPayload>;
}
