//! In-memory note index.
//!
//! # Responsibility
//! - Hold validated notes keyed by identifier, tag, kind, status and time.
//! - Expose read-only lookups for the query layer.
//!
//! # Invariants
//! - An `Index` is never mutated after `IndexBuilder::finish`.
//! - Every id in a secondary map is a key of `notes`.
//! - Per-task action lists are ordered by timestamp, ties by input order.

pub mod builder;
pub mod records;
pub mod snapshot;

pub use builder::{build, BuildOutcome, IndexBuilder};
pub use records::{ActionRecord, ActivityKind, LogRecord, TaskRecord, TimelineEntry};
pub use snapshot::{IndexHandle, IndexSnapshot};

use crate::model::note::{Note, NoteId, NoteKind};
use crate::model::status::TaskStatus;
use std::collections::{BTreeMap, BTreeSet};

/// Immutable index over one load cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Index {
    pub(crate) notes: BTreeMap<NoteId, Note>,
    pub(crate) order: Vec<NoteId>,
    pub(crate) by_tag: BTreeMap<String, BTreeSet<NoteId>>,
    pub(crate) by_kind: BTreeMap<NoteKind, BTreeSet<NoteId>>,
    pub(crate) tasks: BTreeMap<NoteId, TaskRecord>,
    pub(crate) by_status: BTreeMap<TaskStatus, BTreeSet<NoteId>>,
    pub(crate) children: BTreeMap<NoteId, Vec<NoteId>>,
    pub(crate) actions: BTreeMap<NoteId, ActionRecord>,
    pub(crate) task_actions: BTreeMap<NoteId, Vec<NoteId>>,
    pub(crate) logs: BTreeMap<NoteId, LogRecord>,
    pub(crate) timeline: Vec<TimelineEntry>,
}

impl Index {
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.notes.contains_key(id)
    }

    /// All notes in identifier order.
    pub fn notes(&self) -> impl Iterator<Item = &Note> + '_ {
        self.notes.values()
    }

    /// All notes in build input order.
    pub fn notes_in_input_order(&self) -> impl Iterator<Item = &Note> + '_ {
        self.order.iter().filter_map(|id| self.notes.get(id))
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_tag.keys().map(String::as_str)
    }

    pub fn ids_with_tag(&self, tag: &str) -> impl Iterator<Item = &str> + '_ {
        self.by_tag
            .get(tag)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn ids_of_kind(&self, kind: NoteKind) -> impl Iterator<Item = &str> + '_ {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn task(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.get(id)
    }

    /// Task records in identifier order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskRecord> + '_ {
        self.tasks.values()
    }

    pub fn tasks_with_status(&self, status: TaskStatus) -> impl Iterator<Item = &TaskRecord> + '_ {
        self.by_status
            .get(&status)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tasks.get(id))
    }

    /// Direct sub-tasks of `id`, in input order.
    pub fn children(&self, id: &str) -> &[NoteId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn action(&self, id: &str) -> Option<&ActionRecord> {
        self.actions.get(id)
    }

    /// Linked actions of a task, ordered by timestamp.
    pub fn actions_for(&self, task_id: &str) -> impl Iterator<Item = &ActionRecord> + '_ {
        self.task_actions
            .get(task_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.actions.get(id))
    }

    pub fn log(&self, id: &str) -> Option<&LogRecord> {
        self.logs.get(id)
    }

    pub fn logs(&self) -> impl Iterator<Item = &LogRecord> + '_ {
        self.logs.values()
    }

    /// Linked actions and logs ordered by time, ties by input order.
    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }
}
