//! Derived per-kind records stored next to the notes in an index.

use crate::model::note::NoteId;
use crate::model::status::{Priority, TaskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Task view derived from a task note and its actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub id: NoteId,
    /// Status written in the task note.
    pub declared_status: TaskStatus,
    /// Status after replaying recorded transitions.
    pub status: TaskStatus,
    pub priority: Priority,
    pub effort_minutes: Option<i64>,
    pub due: Option<NaiveDate>,
    pub parent: Option<NoteId>,
    /// Set when `parent` does not resolve to another task or closes a cycle.
    pub parent_dangling: bool,
    pub created: Option<DateTime<Utc>>,
    /// When a recorded transition moved the task into a terminal state.
    pub closed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Parent id usable for traversal.
    pub fn resolved_parent(&self) -> Option<&str> {
        if self.parent_dangling {
            None
        } else {
            self.parent.as_deref()
        }
    }
}

/// Logged work on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub id: NoteId,
    pub task: NoteId,
    pub at: DateTime<Utc>,
    pub spent_minutes: Option<i64>,
    pub from: Option<TaskStatus>,
    pub to: Option<TaskStatus>,
    /// Whether the action is attached to its task's action list.
    ///
    /// False for dangling task references and chronology violations.
    pub linked: bool,
    /// Position in build input, used to break timestamp ties.
    pub seq: usize,
}

/// A logbook interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub id: NoteId,
    pub task: Option<NoteId>,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    pub seq: usize,
}

impl LogRecord {
    pub fn duration_minutes(&self) -> Option<i64> {
        self.stop.map(|stop| (stop - self.start).num_minutes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Action,
    Log,
}

/// One point on the activity timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub note_id: NoteId,
    pub kind: ActivityKind,
    /// Task the activity belongs to, when resolved.
    pub task: Option<NoteId>,
    pub seq: usize,
}
