//! CMS entry → domain model mapping.
//!
//! Everything here is a pure function of the raw CMS JSON: no network
//! access, so the whole mapping layer can be tested offline against fixture
//! payloads.
//!
//! # Partial-failure tolerance
//!
//! One malformed entry must never break a listing. [`map_entries`] maps
//! each entry independently; an entry that fails ([`EntryError`]) is logged
//! and skipped while the rest are returned. Field-level problems (bad date,
//! odd author shape, non-document body) are not failures at all: they
//! degrade to defaults.
//!
//! # Field defaults
//!
//! | Field | Source | Default |
//! |-------|--------|---------|
//! | `title` | `fields.title` | `"Untitled"` |
//! | `author` | `fields.authors` | `"Anonymous"` (see [`crate::authors`]) |
//! | `date` | `fields.writtendate` | `""` |
//! | `excerpt` | `fields.excerpt` | `""` |
//! | `content` | `fields.body` | placeholder paragraph |
//! | `tags` | `fields.tags` | empty |

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use crate::authors::resolve_authors;
use crate::error::EntryError;
use crate::models::{display_date, Article};
use crate::richtext::render_rich_text;

/// Lookup tables for entries and assets included alongside a CMS response.
///
/// Built from the `includes` object of an entries response (one level of
/// link inclusion). Used to resolve author references and embedded assets.
#[derive(Debug, Clone, Default)]
pub struct Includes {
    entries: HashMap<String, Value>,
    assets: HashMap<String, Value>,
}

impl Includes {
    /// Build lookup tables from a response `includes` object
    /// (`{ "Entry": [...], "Asset": [...] }`). Missing keys are fine.
    pub fn from_response(includes: &Value) -> Self {
        Self {
            entries: index_by_id(includes.get("Entry")),
            assets: index_by_id(includes.get("Asset")),
        }
    }

    /// Build an entry-only lookup from an iterator of included entries.
    pub fn from_entries<I: IntoIterator<Item = Value>>(entries: I) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|e| sys_id(&e).map(|id| (id.to_string(), e.clone())))
            .collect();
        Self {
            entries,
            assets: HashMap::new(),
        }
    }

    pub fn entry(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    pub fn asset(&self, id: &str) -> Option<&Value> {
        self.assets.get(id)
    }

    /// Resolve an embedded asset target to its `fields` object.
    ///
    /// Accepts either an already inlined asset or a `Link` stub.
    pub fn resolve_asset<'a>(&'a self, target: &'a Value) -> Option<&'a Value> {
        if let Some(fields) = target.get("fields").filter(|f| f.is_object()) {
            return Some(fields);
        }
        if is_link(target, "Asset") {
            return self
                .asset(sys_id(target)?)
                .and_then(|a| a.get("fields"))
                .filter(|f| f.is_object());
        }
        None
    }

    /// Resolve an entry reference to its `fields` object.
    ///
    /// Accepts either a `Link` stub (looked up here) or an inlined entry.
    pub fn resolve_entry<'a>(&'a self, reference: &'a Value) -> Option<&'a Value> {
        if is_link(reference, "Entry") {
            return self
                .entry(sys_id(reference)?)
                .and_then(|e| e.get("fields"))
                .filter(|f| f.is_object());
        }
        if sys_type(reference) == Some("Entry") {
            return reference.get("fields").filter(|f| f.is_object());
        }
        None
    }
}

fn index_by_id(items: Option<&Value>) -> HashMap<String, Value> {
    items
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| sys_id(item).map(|id| (id.to_string(), item.clone())))
        .collect()
}

pub(crate) fn sys_id(value: &Value) -> Option<&str> {
    value.pointer("/sys/id").and_then(Value::as_str)
}

pub(crate) fn sys_type(value: &Value) -> Option<&str> {
    value.pointer("/sys/type").and_then(Value::as_str)
}

fn is_link(value: &Value, link_type: &str) -> bool {
    sys_type(value) == Some("Link")
        && value.pointer("/sys/linkType").and_then(Value::as_str) == Some(link_type)
}

/// Result of mapping a batch of entries: the articles plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct MappedEntries {
    pub articles: Vec<Article>,
    pub skipped: Vec<EntryError>,
}

/// Map raw CMS entries to articles, skipping (and logging) unparseable ones.
///
/// Order is preserved; the CMS query already sorts by publish date.
pub fn map_entries(raw_entries: &[Value], includes: &Includes) -> Vec<Article> {
    map_entries_with_report(raw_entries, includes).articles
}

/// Like [`map_entries`], but also returns the per-entry failures.
pub fn map_entries_with_report(raw_entries: &[Value], includes: &Includes) -> MappedEntries {
    let mut out = MappedEntries::default();

    for (index, entry) in raw_entries.iter().enumerate() {
        match map_entry(index, entry, includes) {
            Ok(article) => out.articles.push(article),
            Err(err) => {
                tracing::warn!(
                    entry_id = err.entry_id().unwrap_or("<none>"),
                    error = %err,
                    "failed to parse CMS entry, skipping"
                );
                out.skipped.push(err);
            }
        }
    }

    out
}

/// Map a full entries response body (`items` + `includes`).
pub fn map_collection(response: &Value) -> MappedEntries {
    let includes = response
        .get("includes")
        .map(Includes::from_response)
        .unwrap_or_default();
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    map_entries_with_report(items, &includes)
}

/// Map one CMS entry. `index` is its position in the response, for errors.
pub fn map_entry(index: usize, entry: &Value, includes: &Includes) -> Result<Article, EntryError> {
    let id = sys_id(entry).ok_or(EntryError::MissingId { index })?;
    let fields = entry
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| EntryError::MissingFields { id: id.to_string() })?;

    let null = Value::Null;
    let field = |name: &str| fields.get(name).unwrap_or(&null);

    Ok(Article {
        id: id.to_string(),
        title: text_or(fields, "title", "Untitled"),
        author: resolve_authors(field("authors"), includes),
        date: format_date_field(field("writtendate")),
        excerpt: text_or(fields, "excerpt", ""),
        content: render_rich_text(field("body"), includes),
        tags: tags(field("tags")),
        comments: Vec::new(),
    })
}

/// Render the bio `description` field. Non-documents become the placeholder.
pub fn map_bio_description(raw_field: &Value, includes: &Includes) -> String {
    render_rich_text(raw_field, includes)
}

/// Parse and format a CMS date field; anything unusable becomes `""`.
pub fn format_date_field(raw: &Value) -> String {
    raw.as_str()
        .and_then(|s| parse_date(s.trim()))
        .map(display_date)
        .unwrap_or_default()
}

/// Accepts the date shapes the CMS emits: RFC 3339, datetime with a
/// minute-precision offset, naive datetime, or a bare date.
fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Scalar field as text, falling back to `default` when absent or empty.
fn text_or(fields: &Map<String, Value>, name: &str, default: &str) -> String {
    fields
        .get(name)
        .and_then(scalar_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn tags(raw: &Value) -> Vec<String> {
    raw.as_array()
        .map(|items| {
            items
                .iter()
                .map(|t| scalar_text(t).unwrap_or_else(|| t.to_string()))
                .collect()
        })
        .unwrap_or_default()
}
