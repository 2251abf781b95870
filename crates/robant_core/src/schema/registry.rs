//! Per-kind field registry.
//!
//! # Responsibility
//! - Hold the ordered field specs of every registered note kind.
//! - Read schema documents into a registry.
//!
//! # Invariants
//! - A kind is registered at most once; a field name at most once per kind.
//! - `id` and `kind` are reserved and never appear as field specs.
//! - Every default conforms to its field type.

use crate::model::note::NoteKind;
use crate::model::status::TaskStatus;
use crate::model::value::FieldValue;
use crate::schema::field::{FieldSpec, FieldType};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Metadata keys owned by the validator itself.
pub const RESERVED_FIELDS: [&str; 2] = ["id", "kind"];

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Registry construction and installation failures.
#[derive(Debug)]
pub enum SchemaError {
    DuplicateKind(NoteKind),
    DuplicateField { kind: NoteKind, field: String },
    ReservedField { kind: NoteKind, field: String },
    InvalidDefault {
        kind: NoteKind,
        field: String,
        message: String,
    },
    UnrecognizedType {
        kind: String,
        field: String,
        type_name: String,
    },
    UnknownKind(String),
    InvalidDocument(String),
    Io {
        path: String,
        source: std::io::Error,
    },
    AlreadyInstalled,
    NotInstalled,
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKind(kind) => write!(f, "kind `{kind}` is already registered"),
            Self::DuplicateField { kind, field } => {
                write!(f, "field `{field}` is already registered for kind `{kind}`")
            }
            Self::ReservedField { kind, field } => {
                write!(f, "field `{field}` is reserved and cannot be registered for `{kind}`")
            }
            Self::InvalidDefault {
                kind,
                field,
                message,
            } => write!(f, "invalid default for `{kind}.{field}`: {message}"),
            Self::UnrecognizedType {
                kind,
                field,
                type_name,
            } => write!(
                f,
                "unrecognized type `{type_name}` for field `{kind}.{field}`"
            ),
            Self::UnknownKind(kind) => write!(f, "unknown note kind `{kind}`"),
            Self::InvalidDocument(message) => write!(f, "invalid schema document: {message}"),
            Self::Io { path, source } => write!(f, "cannot read schema `{path}`: {source}"),
            Self::AlreadyInstalled => write!(f, "a schema is already installed"),
            Self::NotInstalled => write!(f, "no schema is installed"),
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Recognized fields per note kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    kinds: BTreeMap<NoteKind, Vec<FieldSpec>>,
}

impl SchemaRegistry {
    /// Empty registry; no kind validates until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one field to `kind`, creating the kind when absent.
    pub fn register(&mut self, kind: NoteKind, spec: FieldSpec) -> SchemaResult<()> {
        check_spec(kind, &spec)?;
        let specs = self.kinds.entry(kind).or_default();
        if specs.iter().any(|existing| existing.name == spec.name) {
            return Err(SchemaError::DuplicateField {
                kind,
                field: spec.name,
            });
        }
        specs.push(spec);
        Ok(())
    }

    /// Registers a whole kind at once.
    ///
    /// Nothing is registered when any spec is rejected.
    pub fn register_kind(&mut self, kind: NoteKind, specs: Vec<FieldSpec>) -> SchemaResult<()> {
        if self.kinds.contains_key(&kind) {
            return Err(SchemaError::DuplicateKind(kind));
        }
        let mut accepted: Vec<FieldSpec> = Vec::with_capacity(specs.len());
        for spec in specs {
            check_spec(kind, &spec)?;
            if accepted.iter().any(|existing| existing.name == spec.name) {
                return Err(SchemaError::DuplicateField {
                    kind,
                    field: spec.name,
                });
            }
            accepted.push(spec);
        }
        self.kinds.insert(kind, accepted);
        Ok(())
    }

    /// Field specs for `kind` in registration order.
    pub fn resolve(&self, kind: NoteKind) -> Option<&[FieldSpec]> {
        self.kinds.get(&kind).map(Vec::as_slice)
    }

    pub fn kinds(&self) -> impl Iterator<Item = NoteKind> + '_ {
        self.kinds.keys().copied()
    }

    /// Whether any kind declares `field`.
    pub fn knows_field(&self, kind: NoteKind, field: &str) -> bool {
        self.resolve(kind)
            .is_some_and(|specs| specs.iter().any(|spec| spec.name == field))
    }

    /// The default schema covering all five kinds.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (kind, specs) in builtin_specs() {
            // Built-in specs are static and pairwise distinct.
            if let Err(err) = registry.register_kind(kind, specs) {
                log::error!("event=schema_builtin module=schema status=error error={err}");
            }
        }
        registry
    }

    /// Reads a schema document.
    pub fn from_yaml_str(text: &str) -> SchemaResult<Self> {
        let document: SchemaDocument = serde_yaml::from_str(text)
            .map_err(|err| SchemaError::InvalidDocument(err.to_string()))?;

        let mut registry = Self::new();
        for (kind_name, fields) in document.kinds {
            let kind = NoteKind::parse(kind_name.trim())
                .ok_or_else(|| SchemaError::UnknownKind(kind_name.clone()))?;
            let mut specs = Vec::with_capacity(fields.len());
            for field in fields {
                specs.push(field.into_spec(kind)?);
            }
            registry.register_kind(kind, specs)?;
        }
        Ok(registry)
    }

    pub fn load_file(path: &Path) -> SchemaResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

fn check_spec(kind: NoteKind, spec: &FieldSpec) -> SchemaResult<()> {
    let name = spec.name.trim();
    if RESERVED_FIELDS.contains(&name) {
        return Err(SchemaError::ReservedField {
            kind,
            field: spec.name.clone(),
        });
    }
    if name.is_empty() {
        return Err(SchemaError::InvalidDocument(format!(
            "empty field name for kind `{kind}`"
        )));
    }
    if let Some(default) = &spec.default {
        if !spec.field_type.accepts(default) {
            return Err(SchemaError::InvalidDefault {
                kind,
                field: spec.name.clone(),
                message: format!(
                    "`{default}` does not conform to {}",
                    spec.field_type.name()
                ),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDocument {
    #[serde(default)]
    kinds: BTreeMap<String, Vec<FieldDocument>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDocument {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    values: Option<Vec<String>>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    default: Option<serde_yaml::Value>,
}

impl FieldDocument {
    fn into_spec(self, kind: NoteKind) -> SchemaResult<FieldSpec> {
        let field_type = FieldType::from_name(&self.type_name, self.values).ok_or_else(|| {
            SchemaError::UnrecognizedType {
                kind: kind.to_string(),
                field: self.name.clone(),
                type_name: self.type_name.clone(),
            }
        })?;
        let default = match self.default {
            None | Some(serde_yaml::Value::Null) => None,
            Some(raw) => Some(field_type.coerce(&raw).map_err(|message| {
                SchemaError::InvalidDefault {
                    kind,
                    field: self.name.clone(),
                    message,
                }
            })?),
        };
        Ok(FieldSpec {
            name: self.name.trim().to_string(),
            field_type,
            optional: self.optional || default.is_some(),
            default,
        })
    }
}

fn status_values() -> Vec<String> {
    TaskStatus::ALL
        .iter()
        .map(|status| status.as_str().to_string())
        .collect()
}

fn common_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec::optional("title", FieldType::String),
        FieldSpec::optional("tags", FieldType::Tags),
    ]
}

fn builtin_specs() -> Vec<(NoteKind, Vec<FieldSpec>)> {
    let priorities = vec!["high".to_string(), "medium".to_string(), "low".to_string()];

    let mut plan = common_specs();
    plan.extend([
        FieldSpec::optional("slug", FieldType::Slug),
        FieldSpec::optional("uuid", FieldType::Uuid),
        FieldSpec::optional("created", FieldType::DateTime),
    ]);

    let mut task = common_specs();
    task.extend([
        FieldSpec::required("status", FieldType::Enum(status_values())),
        FieldSpec::optional("priority", FieldType::Enum(priorities))
            .with_default(FieldValue::Enum("medium".to_string())),
        FieldSpec::optional("effort", FieldType::Duration),
        FieldSpec::optional("parent", FieldType::Reference),
        FieldSpec::optional("due", FieldType::Date),
        FieldSpec::optional("uuid", FieldType::Uuid),
        FieldSpec::optional("created", FieldType::DateTime),
    ]);

    let mut action = common_specs();
    action.extend([
        FieldSpec::required("task", FieldType::Reference),
        FieldSpec::required("at", FieldType::DateTime),
        FieldSpec::optional("spent", FieldType::Duration),
        FieldSpec::optional("to", FieldType::Enum(status_values())),
        FieldSpec::optional("from", FieldType::Enum(status_values())),
    ]);

    let mut log_kind = common_specs();
    log_kind.extend([
        FieldSpec::required("at", FieldType::DateTime),
        FieldSpec::optional("stop", FieldType::DateTime),
        FieldSpec::optional("task", FieldType::Reference),
    ]);

    vec![
        (NoteKind::Plan, plan),
        (NoteKind::Task, task),
        (NoteKind::Action, action),
        (NoteKind::Log, log_kind),
        (NoteKind::Resource, Vec::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::{SchemaError, SchemaRegistry};
    use crate::model::note::NoteKind;
    use crate::model::value::FieldValue;
    use crate::schema::field::{FieldSpec, FieldType};

    #[test]
    fn builtin_covers_every_kind() {
        let registry = SchemaRegistry::builtin();
        for kind in NoteKind::ALL {
            assert!(registry.resolve(kind).is_some(), "missing kind {kind}");
        }
        let task = registry.resolve(NoteKind::Task).expect("task kind");
        let priority = task
            .iter()
            .find(|spec| spec.name == "priority")
            .expect("priority field");
        assert_eq!(
            priority.default,
            Some(FieldValue::Enum("medium".to_string()))
        );
    }

    #[test]
    fn register_rejects_reserved_and_duplicate_fields() {
        let mut registry = SchemaRegistry::new();
        let reserved = registry.register(
            NoteKind::Plan,
            FieldSpec::optional("id", FieldType::String),
        );
        assert!(matches!(reserved, Err(SchemaError::ReservedField { .. })));

        registry
            .register(NoteKind::Plan, FieldSpec::optional("owner", FieldType::String))
            .expect("first owner should register");
        let duplicate = registry.register(
            NoteKind::Plan,
            FieldSpec::optional("owner", FieldType::String),
        );
        assert!(matches!(duplicate, Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn register_kind_twice_fails() {
        let mut registry = SchemaRegistry::new();
        registry
            .register_kind(NoteKind::Log, Vec::new())
            .expect("first registration");
        assert!(matches!(
            registry.register_kind(NoteKind::Log, Vec::new()),
            Err(SchemaError::DuplicateKind(NoteKind::Log))
        ));
    }

    #[test]
    fn register_rejects_nonconforming_default() {
        let mut registry = SchemaRegistry::new();
        let result = registry.register(
            NoteKind::Task,
            FieldSpec::optional("effort", FieldType::Duration)
                .with_default(FieldValue::Text("soon".to_string())),
        );
        assert!(matches!(result, Err(SchemaError::InvalidDefault { .. })));
    }

    #[test]
    fn resolve_preserves_registration_order() {
        let mut registry = SchemaRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(NoteKind::Plan, FieldSpec::optional(name, FieldType::String))
                .expect("field should register");
        }
        let names: Vec<&str> = registry
            .resolve(NoteKind::Plan)
            .expect("plan kind")
            .iter()
            .map(|spec| spec.name.as_str())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
