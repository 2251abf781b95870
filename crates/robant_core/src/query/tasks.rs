//! Task selection and activity recall.

use crate::index::records::{ActionRecord, ActivityKind, TaskRecord};
use crate::index::Index;
use crate::model::note::{NoteId, NoteKind};
use crate::model::status::{Priority, TaskStatus};
use crate::query::{QueryError, QueryResult, TimeRange};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::PathBuf;

/// Filter for task selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSelection {
    /// Statuses eligible for selection.
    pub statuses: Vec<TaskStatus>,
    pub tag: Option<String>,
}

impl Default for TaskSelection {
    fn default() -> Self {
        Self {
            statuses: TaskStatus::ALL
                .into_iter()
                .filter(|status| status.is_actionable())
                .collect(),
            tag: None,
        }
    }
}

impl TaskSelection {
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Owned task summary handed to callers and adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub id: NoteId,
    pub title: Option<String>,
    pub path: PathBuf,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due: Option<NaiveDate>,
    pub effort_minutes: Option<i64>,
    pub parent: Option<NoteId>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionView {
    pub id: NoteId,
    pub task: NoteId,
    pub title: Option<String>,
    pub at: DateTime<Utc>,
    pub spent_minutes: Option<i64>,
    pub from: Option<TaskStatus>,
    pub to: Option<TaskStatus>,
}

/// One action or log on the activity timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityView {
    pub at: DateTime<Utc>,
    pub note_id: NoteId,
    pub kind: ActivityKind,
    pub task: Option<NoteId>,
    /// End of a log interval.
    pub stop: Option<DateTime<Utc>>,
}

/// Eligible tasks, best first: priority desc, due asc (missing last), id asc.
pub fn ranked_tasks(index: &Index, selection: &TaskSelection) -> Vec<TaskView> {
    let mut candidates: Vec<&TaskRecord> = index
        .tasks()
        .filter(|task| selection.statuses.contains(&task.status))
        .filter(|task| match &selection.tag {
            Some(tag) => index
                .get(&task.id)
                .is_some_and(|note| note.tags.contains(tag)),
            None => true,
        })
        .collect();
    candidates.sort_by(|left, right| compare_tasks(left, right));
    candidates
        .into_iter()
        .filter_map(|task| task_view(index, task))
        .collect()
}

/// The single best task for `selection`, if any.
pub fn select_next_task(index: &Index, selection: &TaskSelection) -> Option<TaskView> {
    ranked_tasks(index, selection).into_iter().next()
}

/// Actions of `task_id` inside `range`, ascending by timestamp.
///
/// # Errors
/// - `NotFound` when no note has this id.
/// - `NotATask` when the note is not a task.
pub fn recall_actions(
    index: &Index,
    task_id: &str,
    range: TimeRange,
) -> QueryResult<Vec<ActionView>> {
    require_task(index, task_id)?;
    Ok(index
        .actions_for(task_id)
        .filter(|action| range.contains(action.at))
        .map(|action| action_view(index, action))
        .collect())
}

/// Actions and logs of all tasks inside `range`, in time order.
pub fn recall_activity(index: &Index, range: TimeRange) -> Vec<ActivityView> {
    index
        .timeline()
        .iter()
        .filter(|entry| range.contains(entry.at))
        .map(|entry| ActivityView {
            at: entry.at,
            note_id: entry.note_id.clone(),
            kind: entry.kind,
            task: entry.task.clone(),
            stop: match entry.kind {
                ActivityKind::Log => index.log(&entry.note_id).and_then(|log| log.stop),
                ActivityKind::Action => None,
            },
        })
        .collect()
}

/// Direct sub-tasks of `task_id` in input order.
///
/// # Errors
/// - `NotFound` / `NotATask` as for `recall_actions`.
pub fn subtasks(index: &Index, task_id: &str) -> QueryResult<Vec<TaskView>> {
    require_task(index, task_id)?;
    Ok(index
        .children(task_id)
        .iter()
        .filter_map(|child| index.task(child))
        .filter_map(|task| task_view(index, task))
        .collect())
}

fn require_task(index: &Index, id: &str) -> QueryResult<()> {
    match index.get(id) {
        None => Err(QueryError::NotFound(id.to_string())),
        Some(note) if note.kind != NoteKind::Task => Err(QueryError::NotATask(id.to_string())),
        Some(_) => Ok(()),
    }
}

fn compare_tasks(left: &TaskRecord, right: &TaskRecord) -> Ordering {
    right
        .priority
        .cmp(&left.priority)
        .then_with(|| match (left.due, right.due) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| left.id.cmp(&right.id))
}

fn task_view(index: &Index, task: &TaskRecord) -> Option<TaskView> {
    let note = index.get(&task.id)?;
    Some(TaskView {
        id: task.id.clone(),
        title: note.title.clone(),
        path: note.path.clone(),
        status: task.status,
        priority: task.priority,
        due: task.due,
        effort_minutes: task.effort_minutes,
        parent: task.resolved_parent().map(str::to_string),
        tags: note.tags.iter().cloned().collect(),
    })
}

fn action_view(index: &Index, action: &ActionRecord) -> ActionView {
    ActionView {
        id: action.id.clone(),
        task: action.task.clone(),
        title: index.get(&action.id).and_then(|note| note.title.clone()),
        at: action.at,
        spent_minutes: action.spent_minutes,
        from: action.from,
        to: action.to,
    }
}
