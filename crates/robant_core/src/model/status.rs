//! Task status state machine and priority ordering.
//!
//! # Invariants
//! - Legal transitions are exactly the edges of `TRANSITIONS`.
//! - Re-stating the current status is always legal and changes nothing.
//! - Replay starts from `TaskStatus::Open`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lifecycle state of a task note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not started.
    Open,
    /// Work in progress.
    Active,
    /// Waiting on something outside the task.
    Blocked,
    /// Completed.
    Done,
    /// Abandoned.
    Cancelled,
}

static TRANSITIONS: [(TaskStatus, &[TaskStatus]); 5] = [
    (
        TaskStatus::Open,
        &[TaskStatus::Active, TaskStatus::Blocked, TaskStatus::Cancelled],
    ),
    (
        TaskStatus::Active,
        &[TaskStatus::Blocked, TaskStatus::Done, TaskStatus::Cancelled],
    ),
    (
        TaskStatus::Blocked,
        &[TaskStatus::Active, TaskStatus::Cancelled],
    ),
    (TaskStatus::Done, &[]),
    (TaskStatus::Cancelled, &[]),
];

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Open,
        TaskStatus::Active,
        TaskStatus::Blocked,
        TaskStatus::Done,
        TaskStatus::Cancelled,
    ];

    /// Stable metadata spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the metadata spelling. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == value)
    }

    /// Statuses directly reachable from `self`.
    pub fn successors(self) -> &'static [TaskStatus] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, next)| *next)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        self == next || self.successors().contains(&next)
    }

    /// Applies one transition.
    pub fn transition(self, next: TaskStatus) -> Result<TaskStatus, IllegalTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition { from: self, to: next })
        }
    }

    /// Replays a transition sequence from `Open`.
    ///
    /// Stops at the first illegal step.
    pub fn replay<I>(transitions: I) -> Result<TaskStatus, IllegalTransition>
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        transitions
            .into_iter()
            .try_fold(TaskStatus::Open, TaskStatus::transition)
    }

    /// Whether a task in this status may be picked as the next task.
    pub fn is_actionable(self) -> bool {
        matches!(self, Self::Open | Self::Active)
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition missing from the status table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

impl Display for IllegalTransition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal status transition `{}` -> `{}`", self.from, self.to)
    }
}

impl Error for IllegalTransition {}

/// Task priority. Ordering is `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
