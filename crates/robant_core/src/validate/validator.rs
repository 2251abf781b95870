//! Schema validation of raw notes.
//!
//! # Responsibility
//! - Turn a `ParsedNote` into a typed `Note` plus every problem found.
//!
//! # Invariants
//! - Validation never stops at the first error of a note.
//! - A note is rejected iff one of its errors `rejects_note()`.
//! - Unknown kind is the only error reported for that note.

use crate::config::{LoaderConfig, ValidationConfig};
use crate::model::note::{Metadata, Note, NoteKind, ParsedNote, RawNote};
use crate::model::status::TaskStatus;
use crate::model::value::FieldValue;
use crate::schema::registry::SchemaRegistry;
use crate::validate::error::{ValidationError, ValidationErrorKind};
use log::debug;
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of validating one note.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    /// `None` when the note was rejected.
    pub note: Option<Note>,
    pub errors: Vec<ValidationError>,
}

/// Checks raw notes against a schema registry.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a SchemaRegistry,
    default_kind: NoteKind,
    strict_fields: bool,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a SchemaRegistry) -> Self {
        Self {
            schema,
            default_kind: NoteKind::Plan,
            strict_fields: false,
        }
    }

    pub fn from_config(
        schema: &'a SchemaRegistry,
        loader: &LoaderConfig,
        validation: &ValidationConfig,
    ) -> Self {
        Self::new(schema)
            .with_default_kind(loader.default_kind)
            .with_strict_fields(validation.strict_fields)
    }

    pub fn with_default_kind(mut self, kind: NoteKind) -> Self {
        self.default_kind = kind;
        self
    }

    pub fn with_strict_fields(mut self, strict: bool) -> Self {
        self.strict_fields = strict;
        self
    }

    /// Validates one loader (or adapter) record.
    pub fn validate(&self, parsed: ParsedNote) -> Validation {
        let raw = match parsed {
            ParsedNote::Ok(raw) => raw,
            ParsedNote::Failed { note, error } => {
                return Validation {
                    errors: vec![ValidationError::new(
                        ValidationErrorKind::Parse,
                        note.derived_id,
                        Some(note.path),
                        error,
                    )],
                    note: None,
                };
            }
        };

        let RawNote {
            path,
            derived_id,
            origin,
            mut metadata,
            body,
            modified,
        } = raw;
        let mut errors = Vec::new();

        let id = match take_present(&mut metadata, "id") {
            None => derived_id.clone(),
            Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
            Some(other) => {
                errors.push(
                    ValidationError::new(
                        ValidationErrorKind::Type,
                        derived_id.clone(),
                        Some(path.clone()),
                        format!("id must be a non-empty string, got {}", short(&other)),
                    )
                    .with_field("id"),
                );
                derived_id.clone()
            }
        };
        let error = |kind: ValidationErrorKind, message: String| {
            ValidationError::new(kind, id.clone(), Some(path.clone()), message)
        };

        let kind = match take_present(&mut metadata, "kind") {
            None => self.default_kind,
            Some(Value::String(name)) => match NoteKind::parse(name.trim()) {
                Some(kind) if self.schema.resolve(kind).is_some() => kind,
                Some(kind) => {
                    return rejected(vec![error(
                        ValidationErrorKind::UnknownKind,
                        format!("kind `{kind}` has no registered schema"),
                    )]);
                }
                None => {
                    return rejected(vec![error(
                        ValidationErrorKind::UnknownKind,
                        format!("unknown kind `{name}`"),
                    )]);
                }
            },
            Some(other) => {
                errors.push(
                    error(
                        ValidationErrorKind::Type,
                        format!("kind must be a string, got {}", short(&other)),
                    )
                    .with_field("kind"),
                );
                return rejected(errors);
            }
        };
        let Some(specs) = self.schema.resolve(kind) else {
            return rejected(vec![error(
                ValidationErrorKind::UnknownKind,
                format!("kind `{kind}` has no registered schema"),
            )]);
        };

        let mut fields = BTreeMap::new();
        for spec in specs {
            match take_present(&mut metadata, &spec.name) {
                None => {
                    if let Some(default) = &spec.default {
                        fields.insert(spec.name.clone(), default.clone());
                    } else if !spec.optional {
                        errors.push(
                            error(
                                ValidationErrorKind::MissingField,
                                format!("required field `{}` is missing", spec.name),
                            )
                            .with_field(spec.name.as_str()),
                        );
                    }
                }
                Some(raw_value) => match spec.field_type.coerce(&raw_value) {
                    Ok(value) => match check_status_field(kind, &spec.name, &value) {
                        Ok(()) => {
                            fields.insert(spec.name.clone(), value);
                        }
                        Err(message) => errors.push(
                            error(ValidationErrorKind::Type, message)
                                .with_field(spec.name.as_str()),
                        ),
                    },
                    Err(message) => errors.push(
                        error(ValidationErrorKind::Type, message).with_field(spec.name.as_str()),
                    ),
                },
            }
        }

        if self.strict_fields {
            for key in metadata.keys() {
                errors.push(
                    error(
                        ValidationErrorKind::UnknownField,
                        format!("field `{key}` is not declared for kind `{kind}`"),
                    )
                    .with_field(key.as_str()),
                );
            }
        }

        if errors.iter().any(|error| error.kind.rejects_note()) {
            debug!(
                "event=validate_note module=validate status=rejected id={} errors={}",
                id,
                errors.len()
            );
            return Validation { note: None, errors };
        }

        let title = fields
            .get("title")
            .and_then(FieldValue::as_str)
            .map(str::to_string)
            .or_else(|| first_heading(&body));
        let tags: BTreeSet<String> = fields
            .get("tags")
            .and_then(FieldValue::as_tags)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default();

        Validation {
            note: Some(Note {
                id,
                kind,
                path,
                origin,
                title,
                body,
                fields,
                extra: metadata,
                tags,
                modified,
            }),
            errors,
        }
    }
}

fn rejected(errors: Vec<ValidationError>) -> Validation {
    Validation { note: None, errors }
}

/// Removes `key`, treating an explicit null as absent.
fn take_present(metadata: &mut Metadata, key: &str) -> Option<Value> {
    match metadata.remove(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value),
    }
}

fn check_status_field(kind: NoteKind, name: &str, value: &FieldValue) -> Result<(), String> {
    let is_status_field = matches!(
        (kind, name),
        (NoteKind::Task, "status") | (NoteKind::Action, "to" | "from")
    );
    if !is_status_field {
        return Ok(());
    }
    match value.as_str().and_then(TaskStatus::parse) {
        Some(_) => Ok(()),
        None => Err(format!("`{value}` is not a task status")),
    }
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

fn short(value: &Value) -> String {
    match serde_yaml::to_string(value) {
        Ok(text) => text.trim().to_string(),
        Err(_) => format!("{value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{first_heading, Validator};
    use crate::model::note::{NoteKind, ParsedNote, RawNote};
    use crate::schema::registry::SchemaRegistry;
    use crate::validate::error::ValidationErrorKind;

    fn raw(yaml: &str, body: &str) -> ParsedNote {
        let mut note = RawNote::new("plans/a.md", "plans/a");
        note.metadata = crate::loader::frontmatter::parse_metadata_document(yaml)
            .expect("test metadata should decode");
        note.body = body.to_string();
        ParsedNote::Ok(note)
    }

    #[test]
    fn missing_kind_uses_default_kind() {
        let schema = SchemaRegistry::builtin();
        let outcome = Validator::new(&schema).validate(raw("title: Launch\n", ""));
        let note = outcome.note.expect("plan note should validate");
        assert_eq!(note.kind, NoteKind::Plan);
        assert_eq!(note.id, "plans/a");
        assert_eq!(note.title.as_deref(), Some("Launch"));
    }

    #[test]
    fn heading_supplies_missing_title() {
        assert_eq!(
            first_heading("intro\n# Real Title \n## Sub"),
            Some("Real Title".to_string())
        );
        assert_eq!(first_heading("## only sub"), None);
    }

    #[test]
    fn null_required_field_counts_as_missing() {
        let schema = SchemaRegistry::builtin();
        let outcome = Validator::new(&schema).validate(raw("kind: task\nstatus: ~\n", ""));
        assert!(outcome.note.is_none());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, ValidationErrorKind::MissingField);
        assert_eq!(outcome.errors[0].field.as_deref(), Some("status"));
    }

    #[test]
    fn non_string_id_is_a_type_error() {
        let schema = SchemaRegistry::builtin();
        let outcome = Validator::new(&schema).validate(raw("id: 7\n", ""));
        assert!(outcome.note.is_none());
        assert_eq!(outcome.errors[0].kind, ValidationErrorKind::Type);
        assert_eq!(outcome.errors[0].field.as_deref(), Some("id"));
    }

    #[test]
    fn kind_without_schema_is_unknown() {
        let schema = SchemaRegistry::new();
        let outcome = Validator::new(&schema).validate(raw("kind: task\n", ""));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, ValidationErrorKind::UnknownKind);
    }
}
