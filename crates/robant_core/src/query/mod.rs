//! Query engine over an index snapshot.
//!
//! # Responsibility
//! - Search notes by text and structured predicates.
//! - Select the next task and recall past activity.
//!
//! # Invariants
//! - Queries are pure reads; they never touch the filesystem.
//! - Result ordering is fully deterministic.

pub mod search;
pub mod tasks;

pub use search::{search, SearchHit, SearchQuery};
pub use tasks::{
    ranked_tasks, recall_actions, recall_activity, select_next_task, subtasks, ActionView,
    ActivityView, TaskSelection, TaskView,
};

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// No note has this identifier.
    NotFound(String),
    /// The identifier names a note that is not a task.
    NotATask(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::NotATask(id) => write!(f, "note is not a task: {id}"),
        }
    }
}

impl Error for QueryError {}

/// Half-open time range `[start, end)`; missing bounds are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at < end)
    }
}

#[cfg(test)]
mod tests {
    use super::TimeRange;
    use chrono::{TimeZone, Utc};

    #[test]
    fn range_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let range = TimeRange::between(start, end);
        assert!(range.contains(start));
        assert!(!range.contains(end));
        assert!(TimeRange::all().contains(end));
        assert!(TimeRange::until(end).contains(start));
        assert!(!TimeRange::since(end).contains(start));
    }
}
