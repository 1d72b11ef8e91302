//! Initial site load and the load-failure diagnostics.
//!
//! ```text
//!              ┌── fetch_articles ──────────┐
//!  load_site ──┼── fetch_asset_url(banner) ─┼──▶ SiteContent
//!              ├── fetch_asset_url(bio img)─┤        or
//!              └── fetch_bio_description ───┘    first CmsError
//! ```
//!
//! The four reads run concurrently and the load fails as a whole: there is
//! no partially loaded site. On failure, [`diagnose`] runs the content-model
//! inspector so the error view can show what the CMS actually has.

use serde::Serialize;

use bylines_core::models::{Bio, ContentTypeField, SiteContent};

use crate::cms::ContentSource;
use crate::config::SiteConfig;
use crate::error::CmsError;

/// Load everything the site needs, concurrently.
pub async fn load_site(source: &dyn ContentSource, site: &SiteConfig) -> Result<SiteContent, CmsError> {
    let (articles, banner_url, bio_image_url, description) = tokio::join!(
        source.fetch_articles(),
        source.fetch_asset_url(&site.banner_asset_id),
        source.fetch_asset_url(&site.bio_image_asset_id),
        source.fetch_bio_description(),
    );

    let articles = articles?;
    let description = description?;

    tracing::info!(articles = articles.len(), "site content loaded");

    Ok(SiteContent {
        articles,
        bio: Bio {
            name: site.owner_name.clone(),
            description,
            image_url: bio_image_url,
        },
        banner_url,
    })
}

/// Load failure plus what the content-model inspector found.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub error: String,
    pub content_type: Option<String>,
    pub fields: Vec<ContentTypeField>,
    /// Why the inspector itself could not run, if it could not.
    pub inspector_error: Option<String>,
}

/// Inspect the configured article content type after a failed load.
pub async fn diagnose(source: &dyn ContentSource, error: &CmsError) -> Diagnosis {
    let content_type = source.article_content_type().map(str::to_string);

    let (fields, inspector_error) = match content_type.as_deref() {
        None => (
            Vec::new(),
            Some("Content type ID is not configured.".to_string()),
        ),
        Some(id) => match source.fetch_content_type(id).await {
            Ok(fields) => (fields, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        },
    };

    Diagnosis {
        error: error.to_string(),
        content_type,
        fields,
        inspector_error,
    }
}

/// Plain-text rendering of a [`Diagnosis`] for the terminal error view.
pub fn render_diagnosis(diagnosis: &Diagnosis) -> String {
    let mut out = format!("Error: {}\n\nContent model inspector\n", diagnosis.error);

    if let Some(ct) = &diagnosis.content_type {
        out.push_str(&format!("  content type: {}\n", ct));
    }
    if let Some(err) = &diagnosis.inspector_error {
        out.push_str(&format!("  {}\n", err));
    } else if diagnosis.fields.is_empty() {
        out.push_str("  (no fields)\n");
    } else {
        out.push_str(&format_fields(&diagnosis.fields));
    }
    out
}

/// Aligned `id  name  type` table of content-type fields.
pub fn format_fields(fields: &[ContentTypeField]) -> String {
    let id_width = fields.iter().map(|f| f.id.len()).max().unwrap_or(0).max(2);
    let name_width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0).max(4);

    let mut out = format!("  {:id_width$}  {:name_width$}  TYPE\n", "ID", "NAME");
    for f in fields {
        out.push_str(&format!(
            "  {:id_width$}  {:name_width$}  {}\n",
            f.id, f.name, f.field_type
        ));
    }
    out
}
