//! Core data models used throughout Bylines.
//!
//! These types are the application's view of CMS content: articles with
//! their session-local comments, the singleton bio, and the schema fields
//! shown by the content-model inspector.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::markup::strip_markup;

/// Average reading speed used for the "min read" estimate.
pub const WORDS_PER_MINUTE: usize = 225;

/// A published article, mapped from one CMS entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// CMS entry identifier. Unique within a load.
    pub id: String,
    pub title: String,
    /// Resolved author display string (never empty).
    pub author: String,
    /// Formatted publish date, or empty when the CMS value is missing/invalid.
    pub date: String,
    pub excerpt: String,
    /// Sanitized HTML rendered from the rich-text body.
    pub content: String,
    pub tags: Vec<String>,
    pub comments: Vec<Comment>,
}

impl Article {
    /// Estimated reading time in whole minutes (at least one).
    pub fn reading_minutes(&self) -> usize {
        let words = strip_markup(&self.content).split_whitespace().count();
        words.div_ceil(WORDS_PER_MINUTE).max(1)
    }

    /// Canonical and social share URLs for this article.
    ///
    /// `base` is the site origin plus path (e.g. `https://example.com/`);
    /// the canonical link uses the same `?articleId=` contract as the router.
    pub fn share_links(&self, base: &str) -> ShareLinks {
        let canonical = format!(
            "{}?articleId={}",
            base.trim_end_matches('?'),
            url::form_urlencoded::byte_serialize(self.id.as_bytes()).collect::<String>()
        );

        let twitter = Url::parse_with_params(
            "https://twitter.com/intent/tweet",
            &[("url", canonical.as_str()), ("text", self.title.as_str())],
        )
        .map(String::from)
        .unwrap_or_default();

        let linkedin = Url::parse_with_params(
            "https://www.linkedin.com/shareArticle",
            &[
                ("mini", "true"),
                ("url", canonical.as_str()),
                ("title", self.title.as_str()),
                ("summary", self.excerpt.as_str()),
            ],
        )
        .map(String::from)
        .unwrap_or_default();

        ShareLinks {
            canonical,
            twitter,
            linkedin,
        }
    }
}

/// Share targets for an article detail view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareLinks {
    pub canonical: String,
    pub twitter: String,
    pub linkedin: String,
}

/// A reader comment. Lives only for the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Creation timestamp in milliseconds, strictly increasing per session.
    pub id: i64,
    pub author: String,
    pub content: String,
    /// Creation date, formatted at creation time.
    pub date: String,
}

/// The site owner's biography. Built once per load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bio {
    pub name: String,
    /// Sanitized HTML rendered from the CMS description field.
    pub description: String,
    pub image_url: String,
}

/// Everything the initial load produces: the article listing, the bio,
/// and the hero banner image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteContent {
    pub articles: Vec<Article>,
    pub bio: Bio,
    pub banner_url: String,
}

/// One field of a CMS content type, as shown by the content-model inspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

/// Format a date the way the site displays it: `March 5, 2024`.
pub fn display_date(date: NaiveDate) -> String {
    format!("{} {}, {}", date.format("%B"), date.day(), date.year())
}
