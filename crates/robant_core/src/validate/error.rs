//! Per-note validation errors.
//!
//! These are reported, never raised: a run collects them and keeps going.

use crate::model::note::NoteId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Category of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    #[serde(rename = "parse_error")]
    Parse,
    MissingField,
    #[serde(rename = "type_error")]
    Type,
    UnknownKind,
    UnknownField,
    IllegalTransition,
    DuplicateIdentifier,
    DanglingReference,
    Chronology,
}

impl ValidationErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse_error",
            Self::MissingField => "missing_field",
            Self::Type => "type_error",
            Self::UnknownKind => "unknown_kind",
            Self::UnknownField => "unknown_field",
            Self::IllegalTransition => "illegal_transition",
            Self::DuplicateIdentifier => "duplicate_identifier",
            Self::DanglingReference => "dangling_reference",
            Self::Chronology => "chronology",
        }
    }

    /// Whether an error of this kind keeps the note out of the index.
    pub fn rejects_note(self) -> bool {
        matches!(
            self,
            Self::Parse | Self::MissingField | Self::Type | Self::UnknownKind
        )
    }
}

impl Display for ValidationErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found in one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub note_id: NoteId,
    pub path: Option<PathBuf>,
    pub field: Option<String>,
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        kind: ValidationErrorKind,
        note_id: impl Into<NoteId>,
        path: Option<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            note_id: note_id.into(),
            path,
            field: None,
            kind,
            message: message.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Location used in reports: the path when known, else the identifier.
    pub fn location(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => self.note_id.clone(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location(), self.kind)?;
        if let Some(field) = &self.field {
            write!(f, " `{field}`")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::{ValidationError, ValidationErrorKind};

    #[test]
    fn display_includes_location_kind_and_field() {
        let error = ValidationError::new(
            ValidationErrorKind::Type,
            "plans/a",
            Some("plans/a.md".into()),
            "expected date",
        )
        .with_field("due");
        assert_eq!(
            error.to_string(),
            "plans/a.md: type_error `due`: expected date"
        );
    }

    #[test]
    fn only_structural_errors_reject_notes() {
        assert!(ValidationErrorKind::MissingField.rejects_note());
        assert!(!ValidationErrorKind::UnknownField.rejects_note());
        assert!(!ValidationErrorKind::DanglingReference.rejects_note());
    }
}
