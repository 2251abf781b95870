//! Typed metadata values produced by schema coercion.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One validated metadata value.
///
/// Durations are stored in whole minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Enum(String),
    Duration(i64),
    Reference(String),
    Uuid(uuid::Uuid),
    Tags(Vec<String>),
}

impl FieldValue {
    /// String-like view for text, enum, reference and slug values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) | Self::Enum(value) | Self::Reference(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Self::Reference(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_minutes(&self) -> Option<i64> {
        match self {
            Self::Duration(minutes) => Some(*minutes),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            Self::DateTime(at) => Some(at.date_naive()),
            _ => None,
        }
    }

    /// Timestamp view. Plain dates map to midnight UTC.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(at) => Some(*at),
            Self::Date(date) => date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()),
            _ => None,
        }
    }

    pub fn as_tags(&self) -> Option<&[String]> {
        match self {
            Self::Tags(tags) => Some(tags),
            _ => None,
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) | Self::Enum(value) | Self::Reference(value) => f.write_str(value),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DateTime(at) => write!(f, "{}", at.to_rfc3339()),
            Self::Duration(minutes) => write!(f, "{minutes}m"),
            Self::Uuid(value) => write!(f, "{value}"),
            Self::Tags(tags) => f.write_str(&tags.join(",")),
        }
    }
}
