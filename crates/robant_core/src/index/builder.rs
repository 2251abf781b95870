//! Index construction from validated notes.
//!
//! # Responsibility
//! - Insert notes, rejecting duplicate identifiers.
//! - Resolve task parents and action/log task references.
//! - Replay recorded status transitions and check chronology.
//!
//! # Invariants
//! - The first note with a given identifier wins.
//! - A note identical in content to the kept one is dropped silently.
//! - Cross-reference problems are reported and never drop a note.
//! - Resolved parent links form a forest: every task on a parent cycle is
//!   detached from its parent.
//! - No effort is accepted on a task after it was closed.

use crate::index::records::{ActionRecord, ActivityKind, LogRecord, TaskRecord, TimelineEntry};
use crate::index::Index;
use crate::model::note::{Note, NoteId, NoteKind};
use crate::model::status::TaskStatus;
use crate::model::value::FieldValue;
use crate::validate::error::{ValidationError, ValidationErrorKind};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Result of one build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub index: Index,
    pub errors: Vec<ValidationError>,
}

/// Builds an index from notes in input order.
pub fn build(notes: impl IntoIterator<Item = Note>) -> BuildOutcome {
    let mut builder = IndexBuilder::new();
    for note in notes {
        builder.insert(note);
    }
    builder.finish()
}

/// Incremental index builder.
///
/// Notes are inserted one by one; cross-references are resolved in `finish`.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    index: Index,
    errors: Vec<ValidationError>,
    dropped: usize,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one note.
    pub fn insert(&mut self, note: Note) {
        if let Some(kept) = self.index.notes.get(&note.id) {
            if kept.same_content(&note) {
                debug!(
                    "event=index_insert module=index status=skipped reason=identical id={}",
                    note.id
                );
                self.dropped += 1;
                return;
            }
            self.errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateIdentifier,
                note.id.clone(),
                Some(note.path.clone()),
                format!(
                    "identifier `{}` is already used by `{}`",
                    note.id,
                    kept.path.display()
                ),
            ));
            return;
        }
        self.index.order.push(note.id.clone());
        self.index.notes.insert(note.id.clone(), note);
    }

    /// Resolves references and freezes the index.
    pub fn finish(mut self) -> BuildOutcome {
        let started = Instant::now();
        self.index_tags_and_kinds();
        self.check_uuids();
        self.link_tasks();
        self.break_parent_cycles();
        self.link_actions();
        self.replay_statuses();
        self.link_logs();
        self.reject_effort_after_close();
        self.index_statuses_and_timeline();

        info!(
            "event=index_build module=index status=ok notes={} tasks={} actions={} logs={} dropped={} errors={} duration_ms={}",
            self.index.notes.len(),
            self.index.tasks.len(),
            self.index.actions.len(),
            self.index.logs.len(),
            self.dropped,
            self.errors.len(),
            started.elapsed().as_millis()
        );
        BuildOutcome {
            index: self.index,
            errors: self.errors,
        }
    }

    fn report(&mut self, kind: ValidationErrorKind, id: &str, field: &str, message: String) {
        let path = self.index.notes.get(id).map(|note| note.path.clone());
        self.errors
            .push(ValidationError::new(kind, id, path, message).with_field(field));
    }

    fn notes_of_kind(&self, kind: NoteKind) -> Vec<(usize, NoteId)> {
        self.index
            .order
            .iter()
            .enumerate()
            .filter(|(_, id)| {
                self.index
                    .notes
                    .get(*id)
                    .is_some_and(|note| note.kind == kind)
            })
            .map(|(seq, id)| (seq, id.clone()))
            .collect()
    }

    fn index_tags_and_kinds(&mut self) {
        for note in self.index.notes.values() {
            self.index
                .by_kind
                .entry(note.kind)
                .or_default()
                .insert(note.id.clone());
            for tag in &note.tags {
                self.index
                    .by_tag
                    .entry(tag.clone())
                    .or_default()
                    .insert(note.id.clone());
            }
        }
    }

    /// A `uuid` names one note across the hierarchy; later claimants are reported.
    fn check_uuids(&mut self) {
        let mut owners: BTreeMap<uuid::Uuid, NoteId> = BTreeMap::new();
        let mut clashes = Vec::new();
        for id in &self.index.order {
            let Some(FieldValue::Uuid(uuid)) =
                self.index.notes.get(id).and_then(|note| note.field("uuid"))
            else {
                continue;
            };
            match owners.get(uuid) {
                Some(owner) => clashes.push((id.clone(), *uuid, owner.clone())),
                None => {
                    owners.insert(*uuid, id.clone());
                }
            }
        }
        for (id, uuid, owner) in clashes {
            self.report(
                ValidationErrorKind::DuplicateIdentifier,
                &id,
                "uuid",
                format!("uuid `{uuid}` is already used by `{owner}`"),
            );
        }
    }

    fn link_tasks(&mut self) {
        for (_, id) in self.notes_of_kind(NoteKind::Task) {
            let Some(note) = self.index.notes.get(&id) else {
                continue;
            };
            let declared_status = note.declared_status().unwrap_or(TaskStatus::Open);
            let mut record = TaskRecord {
                id: id.clone(),
                declared_status,
                status: declared_status,
                priority: note.priority(),
                effort_minutes: note.field("effort").and_then(FieldValue::as_minutes),
                due: note.field("due").and_then(FieldValue::as_date),
                parent: note.field("parent").and_then(reference),
                parent_dangling: false,
                created: note.field("created").and_then(FieldValue::as_datetime),
                closed_at: None,
            };

            if let Some(parent) = record.parent.clone() {
                let problem = if parent == id {
                    Some("task cannot be its own parent".to_string())
                } else {
                    match self.index.notes.get(&parent) {
                        None => Some(format!("parent `{parent}` does not exist")),
                        Some(target) if !target.is_task() => {
                            Some(format!("parent `{parent}` is not a task"))
                        }
                        Some(_) => None,
                    }
                };
                match problem {
                    Some(message) => {
                        record.parent_dangling = true;
                        self.report(ValidationErrorKind::DanglingReference, &id, "parent", message);
                    }
                    None => self
                        .index
                        .children
                        .entry(parent)
                        .or_default()
                        .push(id.clone()),
                }
            }
            self.index.tasks.insert(id, record);
        }
    }

    /// Walks every parent chain and detaches the tasks that sit on a cycle.
    fn break_parent_cycles(&mut self) {
        let mut on_cycle: BTreeSet<NoteId> = BTreeSet::new();
        let mut settled: BTreeSet<NoteId> = BTreeSet::new();
        let tasks = self.notes_of_kind(NoteKind::Task);

        for (_, start) in &tasks {
            let mut chain: Vec<NoteId> = Vec::new();
            let mut cursor = Some(start.clone());
            while let Some(id) = cursor {
                if settled.contains(&id) || on_cycle.contains(&id) {
                    break;
                }
                if let Some(pos) = chain.iter().position(|seen| *seen == id) {
                    on_cycle.extend(chain[pos..].iter().cloned());
                    break;
                }
                cursor = self
                    .index
                    .tasks
                    .get(&id)
                    .and_then(TaskRecord::resolved_parent)
                    .map(str::to_string);
                chain.push(id);
            }
            settled.extend(chain.into_iter().filter(|id| !on_cycle.contains(id)));
        }

        for (_, id) in tasks {
            if !on_cycle.contains(&id) {
                continue;
            }
            let Some(record) = self.index.tasks.get_mut(&id) else {
                continue;
            };
            record.parent_dangling = true;
            let Some(parent) = record.parent.clone() else {
                continue;
            };
            if let Some(siblings) = self.index.children.get_mut(&parent) {
                siblings.retain(|child| *child != id);
                if siblings.is_empty() {
                    self.index.children.remove(&parent);
                }
            }
            self.report(
                ValidationErrorKind::DanglingReference,
                &id,
                "parent",
                format!("parent `{parent}` leads back to `{id}`"),
            );
        }
    }

    fn link_actions(&mut self) {
        for (seq, id) in self.notes_of_kind(NoteKind::Action) {
            let Some(note) = self.index.notes.get(&id) else {
                continue;
            };
            let Some(at) = note.field("at").and_then(FieldValue::as_datetime) else {
                continue;
            };
            let Some(task_id) = note.field("task").and_then(reference) else {
                continue;
            };
            let mut record = ActionRecord {
                id: id.clone(),
                task: task_id.clone(),
                at,
                spent_minutes: note.field("spent").and_then(FieldValue::as_minutes),
                from: status_field(note, "from"),
                to: status_field(note, "to"),
                linked: false,
                seq,
            };

            let task_created = self.index.tasks.get(&task_id).map(|task| task.created);
            match task_created {
                None => {
                    let message = if self.index.notes.contains_key(&task_id) {
                        format!("`{task_id}` is not a task")
                    } else {
                        format!("task `{task_id}` does not exist")
                    };
                    self.report(ValidationErrorKind::DanglingReference, &id, "task", message);
                }
                Some(Some(created)) if at < created => {
                    let message = format!(
                        "action at {} precedes task creation at {}",
                        at.to_rfc3339(),
                        created.to_rfc3339()
                    );
                    self.report(ValidationErrorKind::Chronology, &id, "at", message);
                }
                Some(_) => {
                    record.linked = true;
                    self.index
                        .task_actions
                        .entry(task_id)
                        .or_default()
                        .push(id.clone());
                }
            }
            self.index.actions.insert(id, record);
        }

        let actions = &self.index.actions;
        for list in self.index.task_actions.values_mut() {
            list.sort_by_key(|id| actions.get(id).map(|action| (action.at, action.seq)));
        }
    }

    fn replay_statuses(&mut self) {
        let task_ids: Vec<NoteId> = self.index.tasks.keys().cloned().collect();
        for task_id in task_ids {
            let steps: Vec<(NoteId, DateTime<Utc>, Option<TaskStatus>, TaskStatus)> = self
                .index
                .actions_for(&task_id)
                .filter_map(|action| {
                    action
                        .to
                        .map(|to| (action.id.clone(), action.at, action.from, to))
                })
                .collect();
            if steps.is_empty() {
                continue;
            }

            let mut current = TaskStatus::Open;
            let mut closed_at = None;
            for (action_id, at, from, to) in steps {
                if let Some(from) = from {
                    if from != current {
                        self.report(
                            ValidationErrorKind::IllegalTransition,
                            &action_id,
                            "from",
                            format!("action records `{from}` -> `{to}` but task `{task_id}` is `{current}`"),
                        );
                        continue;
                    }
                }
                match current.transition(to) {
                    Ok(next) => {
                        if next.is_terminal() && !current.is_terminal() {
                            closed_at = Some(at);
                        }
                        current = next;
                    }
                    Err(err) => self.report(
                        ValidationErrorKind::IllegalTransition,
                        &action_id,
                        "to",
                        format!("{err} for task `{task_id}`"),
                    ),
                }
            }

            let Some(record) = self.index.tasks.get(&task_id) else {
                continue;
            };
            let declared = record.declared_status;
            let status = match current.transition(declared) {
                Ok(next) => next,
                Err(err) => {
                    self.report(
                        ValidationErrorKind::IllegalTransition,
                        &task_id,
                        "status",
                        format!("declared status: {err}"),
                    );
                    current
                }
            };
            if let Some(record) = self.index.tasks.get_mut(&task_id) {
                record.status = status;
                record.closed_at = closed_at;
            }
        }
    }

    fn link_logs(&mut self) {
        for (seq, id) in self.notes_of_kind(NoteKind::Log) {
            let Some(note) = self.index.notes.get(&id) else {
                continue;
            };
            let Some(start) = note.field("at").and_then(FieldValue::as_datetime) else {
                continue;
            };
            let record = LogRecord {
                id: id.clone(),
                task: note.field("task").and_then(reference),
                start,
                stop: note.field("stop").and_then(FieldValue::as_datetime),
                seq,
            };

            if let Some(task_id) = &record.task {
                if !self.index.tasks.contains_key(task_id) {
                    let message = format!("task `{task_id}` does not exist");
                    self.report(ValidationErrorKind::DanglingReference, &id, "task", message);
                }
            }
            if let Some(stop) = record.stop {
                if stop < start {
                    self.report(
                        ValidationErrorKind::Chronology,
                        &id,
                        "stop",
                        format!(
                            "interval stops at {} before it starts at {}",
                            stop.to_rfc3339(),
                            start.to_rfc3339()
                        ),
                    );
                }
            }
            self.index.logs.insert(id, record);
        }

        let mut closed: Vec<&LogRecord> = self
            .index
            .logs
            .values()
            .filter(|log| log.stop.is_some_and(|stop| stop >= log.start))
            .collect();
        closed.sort_by_key(|log| (log.start, log.seq));

        let mut overlaps = Vec::new();
        let mut latest: Option<&LogRecord> = None;
        for log in closed {
            if let Some(previous) = latest {
                if previous.stop.is_some_and(|stop| log.start < stop) {
                    overlaps.push((log.id.clone(), previous.id.clone()));
                }
            }
            if latest.map_or(true, |previous| log.stop > previous.stop) {
                latest = Some(log);
            }
        }
        for (id, previous) in overlaps {
            self.report(
                ValidationErrorKind::Chronology,
                &id,
                "at",
                format!("interval overlaps log `{previous}`"),
            );
        }
    }

    /// Reports logs and spent actions starting at or after their task closed.
    fn reject_effort_after_close(&mut self) {
        let mut late: Vec<(NoteId, String)> = Vec::new();
        for task in self.index.tasks.values() {
            let Some(closed_at) = task.closed_at else {
                continue;
            };
            for action in self.index.actions_for(&task.id) {
                let spent = action.spent_minutes.is_some() && action.to.is_none();
                if spent && action.at >= closed_at {
                    late.push((
                        action.id.clone(),
                        format!(
                            "effort recorded at {} after task `{}` closed at {}",
                            action.at.to_rfc3339(),
                            task.id,
                            closed_at.to_rfc3339()
                        ),
                    ));
                }
            }
            for log in self.index.logs.values() {
                if log.task.as_deref() == Some(task.id.as_str()) && log.start >= closed_at {
                    late.push((
                        log.id.clone(),
                        format!(
                            "interval starts at {} after task `{}` closed at {}",
                            log.start.to_rfc3339(),
                            task.id,
                            closed_at.to_rfc3339()
                        ),
                    ));
                }
            }
        }
        for (id, message) in late {
            self.report(ValidationErrorKind::Chronology, &id, "at", message);
        }
    }

    fn index_statuses_and_timeline(&mut self) {
        for task in self.index.tasks.values() {
            self.index
                .by_status
                .entry(task.status)
                .or_default()
                .insert(task.id.clone());
        }

        let mut timeline: Vec<TimelineEntry> = self
            .index
            .actions
            .values()
            .filter(|action| action.linked)
            .map(|action| TimelineEntry {
                at: action.at,
                note_id: action.id.clone(),
                kind: ActivityKind::Action,
                task: Some(action.task.clone()),
                seq: action.seq,
            })
            .collect();
        timeline.extend(self.index.logs.values().map(|log| TimelineEntry {
            at: log.start,
            note_id: log.id.clone(),
            kind: ActivityKind::Log,
            task: log
                .task
                .clone()
                .filter(|task| self.index.tasks.contains_key(task)),
            seq: log.seq,
        }));
        timeline.sort_by_key(|entry| (entry.at, entry.seq));
        self.index.timeline = timeline;
    }
}

fn reference(value: &FieldValue) -> Option<NoteId> {
    value.as_str().map(str::to_string)
}

fn status_field(note: &Note, name: &str) -> Option<TaskStatus> {
    note.field(name)
        .and_then(FieldValue::as_str)
        .and_then(TaskStatus::parse)
}
