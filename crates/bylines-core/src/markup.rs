//! Small helpers for working with rendered markup.

use std::sync::LazyLock;

use regex_lite::Regex;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("valid tag pattern"));

/// Remove HTML tags, leaving the text content.
///
/// Used before sending article bodies to the AI endpoints and for the
/// reading-time estimate. Entities are left as-is.
pub fn strip_markup(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Escape text for use in HTML element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    v_htmlescape::escape(text).to_string()
}
