//! Metadata field types and value coercion.
//!
//! # Responsibility
//! - Map declared field types onto `FieldValue`s.
//! - Decide whether a raw YAML value conforms to a declared type.
//!
//! # Invariants
//! - `Null` never reaches `coerce`; callers treat it as absent.
//! - Coercion is pure and locale independent.

use crate::model::value::FieldValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-z]*(-[0-9a-z]+)*$").expect("valid slug regex"));
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z]+(_[0-9A-Za-z]+)*$").expect("valid tag regex"));
static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+)d)?\s*(?:(\d+)h)?\s*(?:(\d+)m)?$").expect("valid duration regex")
});

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Declared type of one metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Date,
    DateTime,
    /// Closed set of allowed spellings.
    Enum(Vec<String>),
    /// Minutes, written as an integer or as `1d2h30m`.
    Duration,
    /// Identifier of another note.
    Reference,
    Uuid,
    Slug,
    Tags,
}

impl FieldType {
    /// Schema document spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Enum(_) => "enum",
            Self::Duration => "duration",
            Self::Reference => "reference",
            Self::Uuid => "uuid",
            Self::Slug => "slug",
            Self::Tags => "tags",
        }
    }

    /// Resolves a schema document type name.
    ///
    /// Returns `None` for unknown names and for `enum` without values.
    pub fn from_name(name: &str, values: Option<Vec<String>>) -> Option<Self> {
        let field_type = match name.trim() {
            "string" => Self::String,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "enum" => match values {
                Some(values) if !values.is_empty() => Self::Enum(values),
                _ => return None,
            },
            "duration" => Self::Duration,
            "reference" => Self::Reference,
            "uuid" => Self::Uuid,
            "slug" => Self::Slug,
            "tags" => Self::Tags,
            _ => return None,
        };
        Some(field_type)
    }

    /// Converts a raw metadata value into a typed value.
    ///
    /// Returns a short human-readable reason on mismatch.
    pub fn coerce(&self, raw: &Value) -> Result<FieldValue, String> {
        match self {
            Self::String => scalar_text(raw)
                .map(FieldValue::Text)
                .ok_or_else(|| format!("expected string, got {}", describe(raw))),
            Self::Date => {
                let text = expect_str(raw, "date")?;
                parse_date(text)
                    .map(FieldValue::Date)
                    .ok_or_else(|| format!("invalid date `{text}`, expected YYYY-MM-DD"))
            }
            Self::DateTime => {
                let text = expect_str(raw, "datetime")?;
                parse_datetime(text)
                    .map(FieldValue::DateTime)
                    .ok_or_else(|| format!("invalid datetime `{text}`"))
            }
            Self::Enum(values) => {
                let text = expect_str(raw, "enum value")?;
                if values.iter().any(|value| value == text) {
                    Ok(FieldValue::Enum(text.to_string()))
                } else {
                    Err(format!(
                        "`{text}` is not one of {}",
                        values.join("|")
                    ))
                }
            }
            Self::Duration => match raw {
                Value::Number(number) => match number.as_i64() {
                    Some(minutes) if minutes >= 0 => Ok(FieldValue::Duration(minutes)),
                    _ => Err(format!("invalid duration `{number}`")),
                },
                Value::String(text) => parse_duration(text)
                    .map(FieldValue::Duration)
                    .ok_or_else(|| format!("invalid duration `{text}`, expected e.g. 1h30m")),
                other => Err(format!("expected duration, got {}", describe(other))),
            },
            Self::Reference => {
                let text = expect_str(raw, "reference")?.trim();
                if text.is_empty() {
                    return Err("reference cannot be empty".to_string());
                }
                Ok(FieldValue::Reference(text.to_string()))
            }
            Self::Uuid => {
                let text = expect_str(raw, "uuid")?;
                uuid::Uuid::parse_str(text)
                    .map(FieldValue::Uuid)
                    .map_err(|err| format!("invalid uuid `{text}`: {err}"))
            }
            Self::Slug => {
                let text = expect_str(raw, "slug")?;
                if SLUG_RE.is_match(text) {
                    Ok(FieldValue::Text(text.to_string()))
                } else {
                    Err(format!("invalid slug `{text}`"))
                }
            }
            Self::Tags => {
                let Value::Sequence(items) = raw else {
                    return Err(format!("expected list of tags, got {}", describe(raw)));
                };
                let mut tags = Vec::with_capacity(items.len());
                for item in items {
                    let tag = expect_str(item, "tag")?;
                    if !TAG_RE.is_match(tag) {
                        return Err(format!("invalid tag `{tag}`"));
                    }
                    tags.push(tag.to_string());
                }
                Ok(FieldValue::Tags(tags))
            }
        }
    }

    /// Whether an already typed value conforms to this type.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (Self::String, FieldValue::Text(_)) => true,
            (Self::Date, FieldValue::Date(_)) => true,
            (Self::DateTime, FieldValue::DateTime(_)) => true,
            (Self::Enum(values), FieldValue::Enum(value)) => values.contains(value),
            (Self::Duration, FieldValue::Duration(minutes)) => *minutes >= 0,
            (Self::Reference, FieldValue::Reference(value)) => !value.trim().is_empty(),
            (Self::Uuid, FieldValue::Uuid(_)) => true,
            (Self::Slug, FieldValue::Text(value)) => SLUG_RE.is_match(value),
            (Self::Tags, FieldValue::Tags(tags)) => tags.iter().all(|tag| TAG_RE.is_match(tag)),
            _ => false,
        }
    }
}

/// One field declared for a note kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub optional: bool,
    /// Applied when an optional field is absent.
    pub default: Option<FieldValue>,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            optional: false,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            optional: true,
            ..Self::required(name, field_type)
        }
    }

    pub fn with_default(mut self, default: FieldValue) -> Self {
        self.default = Some(default);
        self
    }
}

fn expect_str<'a>(raw: &'a Value, what: &str) -> Result<&'a str, String> {
    raw.as_str()
        .ok_or_else(|| format!("expected {what}, got {}", describe(raw)))
}

fn scalar_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn describe(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(at.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    parse_date(trimmed)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_duration(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(minutes) = trimmed.parse::<i64>() {
        return (minutes >= 0).then_some(minutes);
    }
    let captures = DURATION_RE.captures(trimmed)?;
    let part = |index: usize| -> Option<i64> {
        match captures.get(index) {
            Some(found) => found.as_str().parse::<i64>().ok(),
            None => Some(0),
        }
    };
    let days = part(1)?;
    let hours = part(2)?;
    let minutes = part(3)?;
    days.checked_mul(24 * 60)?
        .checked_add(hours.checked_mul(60)?)?
        .checked_add(minutes)
}

#[cfg(test)]
mod tests {
    use super::{FieldSpec, FieldType};
    use crate::model::value::FieldValue;
    use chrono::{TimeZone, Utc};
    use serde_yaml::Value;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).expect("test yaml should parse")
    }

    #[test]
    fn string_accepts_scalars_only() {
        assert_eq!(
            FieldType::String.coerce(&yaml("42")),
            Ok(FieldValue::Text("42".to_string()))
        );
        assert!(FieldType::String.coerce(&yaml("[a, b]")).is_err());
    }

    #[test]
    fn datetime_accepts_rfc3339_naive_and_plain_date() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(
            FieldType::DateTime.coerce(&yaml("2024-03-01T10:30:00+01:00")),
            Ok(FieldValue::DateTime(expected))
        );
        assert_eq!(
            FieldType::DateTime.coerce(&yaml("2024-03-01 09:30")),
            Ok(FieldValue::DateTime(expected))
        );
        assert_eq!(
            FieldType::DateTime.coerce(&yaml("2024-03-01")),
            Ok(FieldValue::DateTime(
                Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
            ))
        );
        assert!(FieldType::DateTime.coerce(&yaml("yesterday")).is_err());
    }

    #[test]
    fn duration_accepts_minutes_and_compound_strings() {
        assert_eq!(
            FieldType::Duration.coerce(&yaml("90")),
            Ok(FieldValue::Duration(90))
        );
        assert_eq!(
            FieldType::Duration.coerce(&yaml("1d2h30m")),
            Ok(FieldValue::Duration(24 * 60 + 150))
        );
        assert_eq!(
            FieldType::Duration.coerce(&yaml("\"45m\"")),
            Ok(FieldValue::Duration(45))
        );
        assert!(FieldType::Duration.coerce(&yaml("-5")).is_err());
        assert!(FieldType::Duration.coerce(&yaml("soon")).is_err());
    }

    #[test]
    fn enum_rejects_unlisted_values() {
        let field_type = FieldType::Enum(vec!["high".to_string(), "low".to_string()]);
        assert_eq!(
            field_type.coerce(&yaml("high")),
            Ok(FieldValue::Enum("high".to_string()))
        );
        let error = field_type.coerce(&yaml("urgent")).unwrap_err();
        assert!(error.contains("high|low"));
    }

    #[test]
    fn slug_and_tags_follow_project_patterns() {
        assert!(FieldType::Slug.coerce(&yaml("robant-core")).is_ok());
        assert!(FieldType::Slug.coerce(&yaml("Robant Core")).is_err());
        assert_eq!(
            FieldType::Tags.coerce(&yaml("[home, deep_work]")),
            Ok(FieldValue::Tags(vec![
                "home".to_string(),
                "deep_work".to_string()
            ]))
        );
        assert!(FieldType::Tags.coerce(&yaml("[bad tag]")).is_err());
        assert!(FieldType::Tags.coerce(&yaml("home")).is_err());
    }

    #[test]
    fn from_name_requires_values_for_enum() {
        assert_eq!(FieldType::from_name("enum", None), None);
        assert_eq!(FieldType::from_name("colour", None), None);
        assert_eq!(FieldType::from_name("uuid", None), Some(FieldType::Uuid));
    }

    #[test]
    fn accepts_checks_defaults() {
        let spec = FieldSpec::optional(
            "priority",
            FieldType::Enum(vec!["high".to_string(), "medium".to_string()]),
        )
        .with_default(FieldValue::Enum("medium".to_string()));
        let default = spec.default.as_ref().expect("default set");
        assert!(spec.field_type.accepts(default));
        assert!(!spec
            .field_type
            .accepts(&FieldValue::Enum("low".to_string())));
    }
}
