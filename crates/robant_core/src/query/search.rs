//! Text and predicate search over indexed notes.

use crate::index::Index;
use crate::model::note::{Note, NoteKind};
use crate::model::status::TaskStatus;
use std::path::PathBuf;

const TITLE_WEIGHT: u32 = 3;
const TAG_WEIGHT: u32 = 2;
const ID_WEIGHT: u32 = 1;

/// Search options. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Whitespace-separated terms; every term must match.
    pub text: Option<String>,
    pub kinds: Vec<NoteKind>,
    /// Every listed tag must be present.
    pub tags: Vec<String>,
    /// Task status filter; non-task notes never match a non-empty filter.
    pub statuses: Vec<TaskStatus>,
    /// `(field, value)` pairs compared against the rendered field value.
    pub fields: Vec<(String, String)>,
    pub path_prefix: Option<PathBuf>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn kind(mut self, kind: NoteKind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn under(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn terms(&self) -> Vec<String> {
        self.text
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }
}

/// One matching note with its relevance score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub note: &'a Note,
    /// Zero when the query has no text.
    pub score: u32,
}

/// Runs `query` against `index`.
///
/// With text, hits are ordered by score descending then id ascending;
/// without text, by id ascending.
pub fn search<'a>(index: &'a Index, query: &SearchQuery) -> Vec<SearchHit<'a>> {
    let terms = query.terms();
    let mut hits: Vec<SearchHit<'a>> = index
        .notes()
        .filter(|note| matches_filters(index, note, query))
        .filter_map(|note| {
            score(note, &terms).map(|score| SearchHit { note, score })
        })
        .collect();

    if !terms.is_empty() {
        // Stable sort keeps the id order among equal scores.
        hits.sort_by(|left, right| right.score.cmp(&left.score));
    }
    if let Some(limit) = query.limit {
        hits.truncate(limit);
    }
    hits
}

fn matches_filters(index: &Index, note: &Note, query: &SearchQuery) -> bool {
    if !query.kinds.is_empty() && !query.kinds.contains(&note.kind) {
        return false;
    }
    if !query.tags.iter().all(|tag| note.tags.contains(tag)) {
        return false;
    }
    if !query.statuses.is_empty() {
        let status = index.task(&note.id).map(|task| task.status);
        if !status.is_some_and(|status| query.statuses.contains(&status)) {
            return false;
        }
    }
    if let Some(prefix) = &query.path_prefix {
        if !note.path.starts_with(prefix) {
            return false;
        }
    }
    query
        .fields
        .iter()
        .all(|(name, expected)| field_equals(note, name, expected))
}

fn field_equals(note: &Note, name: &str, expected: &str) -> bool {
    if let Some(value) = note.field(name) {
        return value.to_string() == expected;
    }
    match note.extra.get(name) {
        Some(serde_yaml::Value::String(value)) => value == expected,
        Some(serde_yaml::Value::Number(value)) => value.to_string() == expected,
        Some(serde_yaml::Value::Bool(value)) => value.to_string() == expected,
        _ => false,
    }
}

/// Relevance of `note` for `terms`, `None` when a term does not match.
fn score(note: &Note, terms: &[String]) -> Option<u32> {
    if terms.is_empty() {
        return Some(0);
    }
    let title = note.title.as_deref().unwrap_or_default().to_lowercase();
    let id = note.id.to_lowercase();
    let body = note.body.to_lowercase();
    let tags: Vec<String> = note.tags.iter().map(|tag| tag.to_lowercase()).collect();

    let mut total = 0u32;
    for term in terms {
        let mut term_score = 0u32;
        if title.contains(term.as_str()) {
            term_score += TITLE_WEIGHT;
        }
        if tags.iter().any(|tag| tag.contains(term.as_str())) {
            term_score += TAG_WEIGHT;
        }
        if id.contains(term.as_str()) {
            term_score += ID_WEIGHT;
        }
        let occurrences = body.matches(term.as_str()).count();
        term_score = term_score.saturating_add(u32::try_from(occurrences).unwrap_or(u32::MAX));
        if term_score == 0 {
            return None;
        }
        total = total.saturating_add(term_score);
    }
    Some(total)
}
