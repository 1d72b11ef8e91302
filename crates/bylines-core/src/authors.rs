//! Author display-string resolution.
//!
//! The CMS "authors" field may be configured as free text, a tag-style
//! list of strings, or a reference (single or multiple) to person entries.
//! The raw payload shape is classified once into [`AuthorsField`] and then
//! resolved with a `match`; nothing downstream probes JSON types again.
//!
//! Resolution never fails and never returns an empty string: when no name
//! can be resolved the result is [`ANONYMOUS`].

use serde_json::Value;

use crate::mapper::{scalar_text, sys_type, Includes};

pub const ANONYMOUS: &str = "Anonymous";

/// The shapes an "authors" field can take.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorsField<'a> {
    /// Absent, null, blank, or an unrecognized shape.
    Absent,
    PlainText(&'a str),
    StringList(Vec<&'a str>),
    SingleReference(&'a Value),
    ReferenceList(Vec<&'a Value>),
}

impl<'a> AuthorsField<'a> {
    /// Classify a raw field value.
    pub fn classify(raw: &'a Value) -> Self {
        match raw {
            Value::String(s) if !s.trim().is_empty() => Self::PlainText(s),
            Value::Array(items) => {
                let strings: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                match strings {
                    Some(strings) => Self::StringList(strings),
                    None => Self::ReferenceList(items.iter().collect()),
                }
            }
            Value::Object(_) if raw.get("sys").is_some() => Self::SingleReference(raw),
            _ => Self::Absent,
        }
    }
}

/// Resolve a raw "authors" field to a display string.
pub fn resolve_authors(raw: &Value, includes: &Includes) -> String {
    let names: Vec<String> = match AuthorsField::classify(raw) {
        AuthorsField::Absent => Vec::new(),
        AuthorsField::PlainText(text) => vec![text.to_string()],
        AuthorsField::StringList(items) => items
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect(),
        AuthorsField::SingleReference(reference) => {
            reference_name(reference, includes).into_iter().collect()
        }
        AuthorsField::ReferenceList(references) => references
            .into_iter()
            .filter_map(|r| reference_name(r, includes))
            .collect(),
    };

    if names.is_empty() {
        ANONYMOUS.to_string()
    } else {
        names.join(", ")
    }
}

/// Name of a referenced person entry: `fields.name`, else `fields.title`.
fn reference_name(reference: &Value, includes: &Includes) -> Option<String> {
    if !matches!(sys_type(reference), Some("Link" | "Entry")) {
        return None;
    }
    let fields = includes.resolve_entry(reference)?;
    ["name", "title"]
        .into_iter()
        .filter_map(|key| fields.get(key).and_then(scalar_text))
        .find(|name| !name.trim().is_empty())
}
