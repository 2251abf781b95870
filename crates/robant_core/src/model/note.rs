//! Note records at each pipeline stage.
//!
//! # Responsibility
//! - `RawNote` is what the loader (or an integration adapter) produces.
//! - `Note` is a validated record ready for indexing.
//! - `ResourceEntry` records non-note files without parsing them.
//!
//! # Invariants
//! - `Note::kind` is always one of the fixed `NoteKind` variants.
//! - `Note::fields` only holds values that passed schema coercion.
//! - Unrecognized metadata lives in `Note::extra` untouched.

use crate::model::status::{Priority, TaskStatus};
use crate::model::value::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Stable note identifier: explicit `id` field or the derived path id.
pub type NoteId = String;

/// Raw metadata mapping as read from front matter.
pub type Metadata = BTreeMap<String, serde_yaml::Value>;

/// Fixed set of note kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Plan,
    Task,
    Action,
    Log,
    Resource,
}

impl NoteKind {
    pub const ALL: [NoteKind; 5] = [
        NoteKind::Plan,
        NoteKind::Task,
        NoteKind::Action,
        NoteKind::Log,
        NoteKind::Resource,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Task => "task",
            Self::Action => "action",
            Self::Log => "log",
            Self::Resource => "resource",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == value)
    }
}

impl Display for NoteKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a note came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum NoteOrigin {
    /// A file inside the hierarchy.
    Local,
    /// A signal imported through an integration adapter.
    Integration { adapter_id: String },
}

impl NoteOrigin {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

/// Unvalidated note as read from disk or from an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNote {
    /// Path relative to the hierarchy root.
    pub path: PathBuf,
    /// Identifier derived from `path`, used when no `id` field is present.
    pub derived_id: NoteId,
    pub origin: NoteOrigin,
    pub metadata: Metadata,
    pub body: String,
    pub modified: Option<DateTime<Utc>>,
}

impl RawNote {
    pub fn new(path: impl Into<PathBuf>, derived_id: impl Into<NoteId>) -> Self {
        Self {
            path: path.into(),
            derived_id: derived_id.into(),
            origin: NoteOrigin::Local,
            metadata: Metadata::new(),
            body: String::new(),
            modified: None,
        }
    }
}

/// Loader output for one note file.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedNote {
    Ok(RawNote),
    /// The file could not be read or its metadata block could not be parsed.
    ///
    /// `note` carries the path and derived id with empty metadata.
    Failed { note: RawNote, error: String },
}

impl ParsedNote {
    pub fn raw(&self) -> &RawNote {
        match self {
            Self::Ok(note) | Self::Failed { note, .. } => note,
        }
    }
}

/// Non-note file recorded by path only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub id: NoteId,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
}

/// Validated note.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub kind: NoteKind,
    pub path: PathBuf,
    pub origin: NoteOrigin,
    pub title: Option<String>,
    pub body: String,
    pub fields: BTreeMap<String, FieldValue>,
    /// Metadata keys no schema field claims.
    pub extra: Metadata,
    pub tags: BTreeSet<String>,
    pub modified: Option<DateTime<Utc>>,
}

impl Note {
    /// Builds the resource note for a non-note file.
    pub fn from_resource(entry: ResourceEntry) -> Self {
        Self {
            id: entry.id,
            kind: NoteKind::Resource,
            path: entry.path,
            origin: NoteOrigin::Local,
            title: None,
            body: String::new(),
            fields: BTreeMap::new(),
            extra: Metadata::new(),
            tags: BTreeSet::new(),
            modified: entry.modified,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn is_task(&self) -> bool {
        self.kind == NoteKind::Task
    }

    /// Declared task status, if this is a task with a valid status field.
    pub fn declared_status(&self) -> Option<TaskStatus> {
        self.field("status")
            .and_then(FieldValue::as_str)
            .and_then(TaskStatus::parse)
    }

    pub fn priority(&self) -> Priority {
        self.field("priority")
            .and_then(FieldValue::as_str)
            .and_then(Priority::parse)
            .unwrap_or_default()
    }

    /// Content equality used to recognize re-imported duplicates.
    ///
    /// Ignores `modified`, which changes on every touch of the file.
    pub fn same_content(&self, other: &Note) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.path == other.path
            && self.origin == other.origin
            && self.fields == other.fields
            && self.extra == other.extra
            && self.body == other.body
    }
}
