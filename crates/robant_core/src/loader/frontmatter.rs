//! Front-matter splitting and metadata decoding.
//!
//! # Invariants
//! - A metadata block only exists when the very first line is `---`.
//! - The closing fence is a line reading `---` or `...`.
//! - Body text after the closing fence is returned byte-for-byte.

use crate::model::note::Metadata;
use serde_yaml::Value;

const OPEN_FENCE: &str = "---";
const CLOSE_FENCES: [&str; 2] = ["---", "..."];

/// A note file split into its metadata block and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitNote<'a> {
    /// YAML text between the fences, `None` when the file has no block.
    pub metadata: Option<&'a str>,
    pub body: &'a str,
}

/// Splits note text at its front-matter fences.
///
/// # Errors
/// - Returns an error when the opening fence has no closing fence.
pub fn split_note(text: &str) -> Result<SplitNote<'_>, String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return Ok(SplitNote {
            metadata: None,
            body: text,
        });
    };
    if fence_text(first) != OPEN_FENCE {
        return Ok(SplitNote {
            metadata: None,
            body: text,
        });
    }

    let block_start = first.len();
    let mut offset = block_start;
    for line in lines {
        if CLOSE_FENCES.contains(&fence_text(line)) {
            return Ok(SplitNote {
                metadata: Some(&text[block_start..offset]),
                body: &text[offset + line.len()..],
            });
        }
        offset += line.len();
    }

    Err("unterminated metadata block: missing closing `---`".to_string())
}

/// Decodes a YAML metadata document into a string-keyed mapping.
///
/// An empty document decodes to an empty mapping.
///
/// # Errors
/// - Returns an error for invalid YAML, a non-mapping document, or a
///   non-string key.
pub fn parse_metadata_document(yaml: &str) -> Result<Metadata, String> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }
    let value: Value =
        serde_yaml::from_str(yaml).map_err(|err| format!("invalid metadata YAML: {err}"))?;
    let mapping = match value {
        Value::Null => return Ok(Metadata::new()),
        Value::Mapping(mapping) => mapping,
        _ => return Err("metadata block must be a mapping".to_string()),
    };

    let mut metadata = Metadata::new();
    for (key, value) in mapping {
        let Value::String(key) = key else {
            return Err(format!("metadata key must be a string, got `{key:?}`"));
        };
        metadata.insert(key, value);
    }
    Ok(metadata)
}

fn fence_text(line: &str) -> &str {
    line.trim_end()
}
