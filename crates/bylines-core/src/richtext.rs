//! Rich-text document rendering.
//!
//! Converts a CMS structured document (a tree of `nodeType`-tagged JSON
//! nodes) into sanitized HTML. Text content is always escaped; markup only
//! comes from the node renderers below.
//!
//! Three node types are rendered with site-specific markup:
//!
//! | Node | Output |
//! |------|--------|
//! | `embedded-asset-block` | `<img>` for image assets, nothing otherwise |
//! | `blockquote` | styled `<blockquote>` |
//! | `paragraph` | styled `<p>`, or nothing when empty / a lone `<br>` |
//!
//! Every other node uses the default rendering (headings, lists, tables,
//! links, marks). Unknown node types render as an empty string.
//!
//! A field that is not a structured document never fails: it renders the
//! [`UNAVAILABLE_PLACEHOLDER`] paragraph instead.

use serde_json::Value;

use crate::mapper::Includes;
use crate::markup::escape_html;

/// Rendered in place of a field that is not a rich-text document.
pub const UNAVAILABLE_PLACEHOLDER: &str = "<p>Content is not available in the expected format.</p>";

const QUOTE_CLASS: &str =
    "border-l-4 border-teal-400 dark:border-teal-500 bg-slate-100 dark:bg-slate-800 p-4 my-6 italic";
const PARAGRAPH_CLASS: &str = "mb-6 leading-relaxed";
const IMAGE_CLASS: &str = "my-8 rounded-lg shadow-xl";

/// Render a rich-text field to HTML.
///
/// `includes` resolves embedded asset links that the CMS did not inline.
pub fn render_rich_text(field: &Value, includes: &Includes) -> String {
    if is_document(field) {
        Renderer { includes }.children(field)
    } else {
        UNAVAILABLE_PLACEHOLDER.to_string()
    }
}

/// Returns `true` if the value is a structured document root.
pub fn is_document(field: &Value) -> bool {
    field.get("nodeType").and_then(Value::as_str) == Some("document")
}

struct Renderer<'a> {
    includes: &'a Includes,
}

impl Renderer<'_> {
    /// Render a node's children in order ("next").
    fn children(&self, node: &Value) -> String {
        node.get("content")
            .and_then(Value::as_array)
            .map(|nodes| nodes.iter().map(|n| self.node(n)).collect())
            .unwrap_or_default()
    }

    fn node(&self, node: &Value) -> String {
        let node_type = node.get("nodeType").and_then(Value::as_str).unwrap_or("");

        match node_type {
            "text" => text(node),
            "embedded-asset-block" => self.embedded_asset(node),
            "blockquote" => format!(
                "<blockquote class=\"{}\">{}</blockquote>",
                QUOTE_CLASS,
                self.children(node)
            ),
            "paragraph" => {
                let content = self.children(node);
                if content.trim().is_empty() || content == "<br>" {
                    String::new()
                } else {
                    format!("<p class=\"{}\">{}</p>", PARAGRAPH_CLASS, content)
                }
            }
            "heading-1" => self.wrap("h1", node),
            "heading-2" => self.wrap("h2", node),
            "heading-3" => self.wrap("h3", node),
            "heading-4" => self.wrap("h4", node),
            "heading-5" => self.wrap("h5", node),
            "heading-6" => self.wrap("h6", node),
            "unordered-list" => self.wrap("ul", node),
            "ordered-list" => self.wrap("ol", node),
            "list-item" => self.wrap("li", node),
            "hr" => "<hr/>".to_string(),
            "table" => self.wrap("table", node),
            "table-row" => self.wrap("tr", node),
            "table-header-cell" => self.wrap("th", node),
            "table-cell" => self.wrap("td", node),
            "embedded-entry-block" | "embedded-resource-block" => self.wrap("div", node),
            "hyperlink" => {
                let href = node
                    .pointer("/data/uri")
                    .and_then(Value::as_str)
                    .map(escape_html)
                    .unwrap_or_default();
                format!("<a href=\"{}\">{}</a>", href, self.children(node))
            }
            "entry-hyperlink" | "asset-hyperlink" | "embedded-entry-inline" => {
                let id = node
                    .pointer("/data/target/sys/id")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                format!("<span>type: {} id: {}</span>", node_type, escape_html(id))
            }
            "resource-hyperlink" | "embedded-resource-inline" => {
                let urn = node
                    .pointer("/data/target/sys/urn")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                format!("<span>type: {} urn: {}</span>", node_type, escape_html(urn))
            }
            _ => String::new(),
        }
    }

    fn wrap(&self, tag: &str, node: &Value) -> String {
        format!("<{tag}>{}</{tag}>", self.children(node))
    }

    fn embedded_asset(&self, node: &Value) -> String {
        let Some(fields) = node
            .pointer("/data/target")
            .and_then(|target| self.includes.resolve_asset(target))
        else {
            return String::new();
        };

        let mime = fields.pointer("/file/contentType").and_then(Value::as_str);
        let url = fields.pointer("/file/url").and_then(Value::as_str);

        match (mime, url) {
            (Some(mime), Some(url)) if mime.starts_with("image/") && !url.is_empty() => {
                let alt = [fields.get("description"), fields.get("title")]
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str)
                    .find(|s| !s.is_empty())
                    .unwrap_or("");
                format!(
                    "<img src=\"https:{}\" alt=\"{}\" class=\"{}\" />",
                    url,
                    escape_html(alt),
                    IMAGE_CLASS
                )
            }
            _ => String::new(),
        }
    }
}

/// Escaped text with marks applied innermost-first.
fn text(node: &Value) -> String {
    let value = node.get("value").and_then(Value::as_str).unwrap_or("");
    let marks = node.get("marks").and_then(Value::as_array);

    marks
        .into_iter()
        .flatten()
        .filter_map(|m| m.get("type").and_then(Value::as_str))
        .fold(escape_html(value), |acc, mark| {
            let tag = match mark {
                "bold" => "b",
                "italic" => "i",
                "underline" => "u",
                "code" => "code",
                "superscript" => "sup",
                "subscript" => "sub",
                "strikethrough" => "s",
                _ => return acc,
            };
            format!("<{tag}>{acc}</{tag}>")
        })
}
