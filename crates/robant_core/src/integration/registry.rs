//! In-process adapter registry with bounded imports.
//!
//! # Responsibility
//! - Register adapters under validated, unique ids.
//! - Run every adapter import on its own thread within a time budget.
//!
//! # Invariants
//! - A timed-out or cancelled import contributes nothing to the cycle.
//! - The abandoned import's cancellation token is tripped.
//! - Import results are collected in adapter id order.

use crate::cancel::{CancelToken, CycleLimits, Interruption};
use crate::integration::adapter::{
    AdapterError, AdapterResult, AdapterStage, ExportPayload, ImportRequest, IntegrationAdapter,
    Signal,
};
use crate::model::note::RawNote;
use crate::query::TaskView;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

static ADAPTER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid adapter id regex"));

/// Adapter registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterRegistryError {
    /// The id is empty or uses characters outside `[a-z0-9_-]`.
    InvalidAdapterId { adapter_id: String, reason: String },
    DuplicateAdapterId(String),
    AdapterNotFound(String),
}

impl Display for AdapterRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAdapterId { adapter_id, reason } => {
                write!(f, "cannot register adapter `{adapter_id}`: {reason}")
            }
            Self::DuplicateAdapterId(adapter_id) => {
                write!(f, "an adapter named `{adapter_id}` is already registered")
            }
            Self::AdapterNotFound(adapter_id) => {
                write!(f, "no adapter registered as `{adapter_id}`")
            }
        }
    }
}

impl Error for AdapterRegistryError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationIssueKind {
    Timeout,
    Cancelled,
    Failed,
}

/// Non-fatal problem with one adapter during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationIssue {
    pub adapter_id: String,
    pub kind: IntegrationIssueKind,
    pub message: String,
}

impl Display for IntegrationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            IntegrationIssueKind::Timeout => "timeout",
            IntegrationIssueKind::Cancelled => "cancelled",
            IntegrationIssueKind::Failed => "failed",
        };
        write!(f, "integration `{}` {kind}: {}", self.adapter_id, self.message)
    }
}

/// Raw notes gathered from all adapters plus the problems met.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub notes: Vec<RawNote>,
    pub issues: Vec<IntegrationIssue>,
}

/// Runtime adapter registry.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn IntegrationAdapter>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.adapter_ids().collect::<Vec<_>>())
            .finish()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `adapter` under its trimmed id.
    ///
    /// # Errors
    /// - `InvalidAdapterId` when the id does not match `[a-z0-9_-]+`.
    /// - `DuplicateAdapterId` when another adapter already uses the id.
    pub fn register(
        &mut self,
        adapter: Arc<dyn IntegrationAdapter>,
    ) -> Result<(), AdapterRegistryError> {
        let adapter_id = adapter.adapter_id().trim().to_string();
        if let Some(reason) = adapter_id_problem(&adapter_id) {
            return Err(AdapterRegistryError::InvalidAdapterId { adapter_id, reason });
        }
        match self.adapters.entry(adapter_id) {
            Entry::Occupied(taken) => Err(AdapterRegistryError::DuplicateAdapterId(
                taken.key().clone(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(adapter);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Registered ids in import order.
    pub fn adapter_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.adapters.keys().map(String::as_str)
    }

    pub fn get(&self, adapter_id: &str) -> Option<Arc<dyn IntegrationAdapter>> {
        self.adapters.get(adapter_id.trim()).map(Arc::clone)
    }

    /// Imports from every adapter, each bounded by `timeout` and `limits`.
    pub fn import_all(&self, limits: &CycleLimits, timeout: Duration) -> ImportOutcome {
        let mut pending = Vec::with_capacity(self.adapters.len());
        let mut outcome = ImportOutcome::default();

        for (adapter_id, adapter) in &self.adapters {
            let request = ImportRequest {
                cancel: CancelToken::new(),
                deadline: Some(limits.bounded_deadline(timeout)),
                since: None,
            };
            match spawn_import(adapter_id, Arc::clone(adapter), request.clone()) {
                Ok(receiver) => pending.push((adapter_id.clone(), request, receiver)),
                Err(message) => outcome.issues.push(IntegrationIssue {
                    adapter_id: adapter_id.clone(),
                    kind: IntegrationIssueKind::Failed,
                    message,
                }),
            }
        }

        for (adapter_id, request, receiver) in pending {
            let started = Instant::now();
            match await_import(&receiver, &request, limits) {
                Ok(signals) => {
                    info!(
                        "event=integration_import module=integration status=ok adapter={} signals={} duration_ms={}",
                        adapter_id,
                        signals.len(),
                        started.elapsed().as_millis()
                    );
                    for signal in signals {
                        if signal.signal_id.trim().is_empty() {
                            outcome.issues.push(IntegrationIssue {
                                adapter_id: adapter_id.clone(),
                                kind: IntegrationIssueKind::Failed,
                                message: "signal without id skipped".to_string(),
                            });
                            continue;
                        }
                        outcome.notes.push(signal.into_raw_note(&adapter_id));
                    }
                }
                Err((kind, message)) => {
                    request.cancel.cancel();
                    warn!(
                        "event=integration_import module=integration status=error adapter={} kind={:?} message={}",
                        adapter_id, kind, message
                    );
                    outcome.issues.push(IntegrationIssue {
                        adapter_id,
                        kind,
                        message,
                    });
                }
            }
        }
        outcome
    }

    /// Renders `tasks` through one adapter.
    pub fn export_to(&self, adapter_id: &str, tasks: &[TaskView]) -> AdapterResult<ExportPayload> {
        let adapter = self.get(adapter_id).ok_or_else(|| {
            AdapterError::new(
                "registry",
                AdapterStage::Export,
                "adapter_not_found",
                format!("No adapter registered as `{}`.", adapter_id.trim()),
                false,
            )
        })?;
        let payload = adapter.export_selection(tasks)?;
        info!(
            "event=integration_export module=integration status=ok adapter={} tasks={}",
            adapter.adapter_id(),
            payload.task_ids.len()
        );
        Ok(payload)
    }
}

type ImportMessage = AdapterResult<Vec<Signal>>;

fn spawn_import(
    adapter_id: &str,
    adapter: Arc<dyn IntegrationAdapter>,
    request: ImportRequest,
) -> Result<Receiver<ImportMessage>, String> {
    let (sender, receiver) = mpsc::channel();
    std::thread::Builder::new()
        .name(format!("robant-import-{adapter_id}"))
        .spawn(move || {
            let result = adapter.import_signals(&request);
            // The receiver is gone when the import was abandoned.
            let _ = sender.send(result);
        })
        .map_err(|err| format!("failed to start import thread: {err}"))?;
    Ok(receiver)
}

fn await_import(
    receiver: &Receiver<ImportMessage>,
    request: &ImportRequest,
    limits: &CycleLimits,
) -> Result<Vec<Signal>, (IntegrationIssueKind, String)> {
    let Some(deadline) = request.deadline else {
        return receiver
            .recv()
            .map_err(|_| {
                (
                    IntegrationIssueKind::Failed,
                    "import thread ended without a result".to_string(),
                )
            })?
            .map_err(|err| (IntegrationIssueKind::Failed, err.to_string()));
    };
    loop {
        if let Some(Interruption::Cancelled) = limits.interruption() {
            return Err((
                IntegrationIssueKind::Cancelled,
                "load cycle cancelled".to_string(),
            ));
        }
        let now = Instant::now();
        if now >= deadline {
            return Err((
                IntegrationIssueKind::Timeout,
                "import exceeded its time budget".to_string(),
            ));
        }
        let wait = (deadline - now).min(POLL_INTERVAL);
        match receiver.recv_timeout(wait) {
            Ok(Ok(signals)) => return Ok(signals),
            Ok(Err(err)) => return Err((IntegrationIssueKind::Failed, err.to_string())),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err((
                    IntegrationIssueKind::Failed,
                    "import thread ended without a result".to_string(),
                ));
            }
        }
    }
}

/// Why `adapter_id` cannot name an adapter, if it cannot.
fn adapter_id_problem(adapter_id: &str) -> Option<String> {
    if adapter_id.is_empty() {
        return Some("id is empty".to_string());
    }
    if ADAPTER_ID_RE.is_match(adapter_id) {
        return None;
    }
    adapter_id
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-'))
        .map(|c| format!("character `{c}` is not allowed"))
}
