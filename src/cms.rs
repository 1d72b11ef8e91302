//! Content gateway over the Contentful Content Delivery API.
//!
//! All reads go to `{base_url}/spaces/{space}/environments/{env}/…` with a
//! bearer token. Raw responses are handed to the pure mapper in
//! [`bylines_core::mapper`]; this module only owns transport and error
//! classification.
//!
//! # Failure policy
//!
//! | Operation | Missing credentials | CMS error |
//! |-----------|---------------------|-----------|
//! | [`fetch_articles`](ContentSource::fetch_articles) | `Configuration` | `Auth` / `Schema` / `Connection` |
//! | [`fetch_bio_description`](ContentSource::fetch_bio_description) | `Configuration` | `Auth` / `Schema` / `Connection` |
//! | [`fetch_asset_url`](ContentSource::fetch_asset_url) | fallback URL | fallback URL |
//! | [`fetch_content_type`](ContentSource::fetch_content_type) | `Configuration` | `Schema` / `Connection` |
//!
//! # Retry Strategy
//!
//! - HTTP 429 or 5xx → retry with exponential backoff (`cms.max_retries`)
//! - Other HTTP errors → fail immediately and classify the CMS error body
//! - Network error → retry

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

use bylines_core::mapper::{map_bio_description, map_collection, Includes};
use bylines_core::models::{Article, ContentTypeField};

use crate::config::CmsConfig;
use crate::error::CmsError;

/// Banner shown whenever an asset cannot be resolved.
pub const FALLBACK_BANNER_URL: &str =
    "https://images.unsplash.com/photo-1579737873652-3a18e001e405?q=80&w=2070&auto=format&fit=crop";

/// Bio description used when the CMS has no bio entry.
pub const BIO_PLACEHOLDER: &str =
    "<p>About me content is not yet available. Please check back later.</p>";

/// Read access to site content. Implemented by [`ContentGateway`]; the
/// site loader and server only depend on this trait.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Configured article content type, if any.
    fn article_content_type(&self) -> Option<&str>;

    /// All articles, newest first. Unparseable entries are skipped.
    async fn fetch_articles(&self) -> Result<Vec<Article>, CmsError>;

    /// Rendered bio HTML, or [`BIO_PLACEHOLDER`] when no bio entry exists.
    async fn fetch_bio_description(&self) -> Result<String, CmsError>;

    /// Absolute URL of an asset's file. Never fails: returns
    /// [`FALLBACK_BANNER_URL`] instead.
    async fn fetch_asset_url(&self, asset_id: &str) -> String;

    /// Field schema of a content type, for the content-model inspector.
    async fn fetch_content_type(
        &self,
        content_type_id: &str,
    ) -> Result<Vec<ContentTypeField>, CmsError>;
}

/// A failed CMS request before classification.
#[derive(Debug)]
enum Failure {
    Api { status: StatusCode, body: Value },
    Transport(String),
}

impl Failure {
    /// `sys.id` of the CMS error body (e.g. `AccessTokenInvalid`).
    fn error_id(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => body.pointer("/sys/id").and_then(Value::as_str),
            Self::Transport(_) => None,
        }
    }

    /// Name of the first validation detail (e.g. `unknownContentType`).
    fn detail_name(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => body
                .pointer("/details/errors/0/name")
                .and_then(Value::as_str),
            Self::Transport(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Api { status, body } => format!("HTTP {}: {}", status, body),
            Self::Transport(msg) => msg.clone(),
        }
    }
}

/// Map an entries-query failure to an error, checking auth first.
fn classify_entries_failure(
    failure: &Failure,
    content_type: &str,
    schema_message: impl FnOnce(&str) -> String,
    connection_message: &str,
) -> CmsError {
    if failure.error_id() == Some("AccessTokenInvalid") {
        return CmsError::Auth;
    }
    if failure.detail_name() == Some("unknownContentType") {
        return CmsError::Schema {
            content_type: content_type.to_string(),
            message: schema_message(content_type),
        };
    }
    CmsError::Connection(connection_message.to_string())
}

fn classify_content_type_failure(failure: &Failure, content_type: &str) -> CmsError {
    if failure.error_id() == Some("NotFound") {
        return CmsError::Schema {
            content_type: content_type.to_string(),
            message: format!(
                "Content type with ID \"{}\" was not found in your Contentful space. \
                 Please check `CONTENTFUL_CONTENT_TYPE_ID`.",
                content_type
            ),
        };
    }
    CmsError::Connection(format!(
        "Could not fetch content model for \"{}\". Please check your credentials and network connection.",
        content_type
    ))
}

/// Absolute URL from an asset body's `fields.file.url` (protocol-relative on Contentful).
fn asset_file_url(asset: &Value) -> Option<String> {
    let url = asset
        .pointer("/fields/file/url")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())?;
    if url.starts_with("//") {
        Some(format!("https:{}", url))
    } else {
        Some(url.to_string())
    }
}

fn parse_content_type_fields(body: &Value) -> Vec<ContentTypeField> {
    let text = |field: &Value, key: &str| {
        field
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    body.get("fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .map(|f| ContentTypeField {
                    id: text(f, "id"),
                    name: text(f, "name"),
                    field_type: text(f, "type"),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// HTTP client for one Contentful space and environment.
pub struct ContentGateway {
    client: reqwest::Client,
    base_url: Url,
    environment: String,
    space_id: Option<String>,
    access_token: Option<String>,
    content_type_id: Option<String>,
    bio_content_type: String,
    max_retries: u32,
}

impl ContentGateway {
    /// Build a gateway. Missing credentials are not an error here; each
    /// operation applies its own policy when it runs.
    pub fn from_config(config: &CmsConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| anyhow::anyhow!("invalid cms.base_url '{}': {}", config.base_url, e))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("invalid cms.base_url '{}'", config.base_url);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());

        Ok(Self {
            client,
            base_url,
            environment: config.environment.clone(),
            space_id: non_empty(&config.space_id),
            access_token: non_empty(&config.access_token),
            content_type_id: non_empty(&config.content_type_id),
            bio_content_type: config.bio_content_type.clone(),
            max_retries: config.max_retries,
        })
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.space_id.as_deref()?, self.access_token.as_deref()?))
    }

    fn endpoint(&self, space: &str, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["spaces", space, "environments", self.environment.as_str()])
                .extend(segments);
        }
        url
    }

    /// GET a JSON document with retry/backoff for 429, 5xx and network errors.
    async fn get_json(&self, url: Url, token: &str, query: &[(&str, &str)]) -> Result<Value, Failure> {
        let mut last = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // 500ms, 1s, 2s, ...
                let delay = Duration::from_millis(500 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            tracing::debug!(url = %url, attempt, "CMS request");
            let resp = self
                .client
                .get(url.clone())
                .bearer_auth(token)
                .query(query)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| Failure::Transport(format!("invalid CMS response: {}", e)));
                    }

                    let text = response.text().await.unwrap_or_default();
                    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
                    let failure = Failure::Api { status, body };

                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        tracing::warn!(status = %status, attempt, "CMS request failed, retrying");
                        last = Some(failure);
                        continue;
                    }
                    return Err(failure);
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "CMS request failed, retrying");
                    last = Some(Failure::Transport(e.to_string()));
                    continue;
                }
            }
        }

        Err(last.unwrap_or_else(|| Failure::Transport("CMS request failed after retries".into())))
    }
}

#[async_trait]
impl ContentSource for ContentGateway {
    fn article_content_type(&self) -> Option<&str> {
        self.content_type_id.as_deref()
    }

    async fn fetch_articles(&self) -> Result<Vec<Article>, CmsError> {
        let (space, token) = self.credentials().ok_or_else(CmsError::missing_credentials)?;
        let content_type = self
            .content_type_id
            .as_deref()
            .ok_or_else(CmsError::missing_content_type)?;

        let url = self.endpoint(space, &["entries"]);
        let query = [
            ("content_type", content_type),
            ("order", "-fields.writtendate"),
            ("include", "1"),
        ];

        let body = self.get_json(url, token, &query).await.map_err(|failure| {
            tracing::error!(error = %failure.describe(), "failed to fetch articles");
            classify_entries_failure(
                &failure,
                content_type,
                |ct| {
                    format!(
                        "Contentful could not find a content type with the ID \"{}\". \
                         Please check `CONTENTFUL_CONTENT_TYPE_ID`.",
                        ct
                    )
                },
                "Could not connect to the content source. Please check your credentials and your network connection.",
            )
        })?;

        let mapped = map_collection(&body);
        tracing::info!(
            articles = mapped.articles.len(),
            skipped = mapped.skipped.len(),
            "fetched articles"
        );
        Ok(mapped.articles)
    }

    async fn fetch_bio_description(&self) -> Result<String, CmsError> {
        let (space, token) = self.credentials().ok_or_else(CmsError::missing_credentials)?;
        let content_type = self.bio_content_type.as_str();

        let url = self.endpoint(space, &["entries"]);
        let query = [("content_type", content_type), ("limit", "1"), ("include", "1")];

        let body = self.get_json(url, token, &query).await.map_err(|failure| {
            tracing::error!(error = %failure.describe(), "failed to fetch bio description");
            classify_entries_failure(
                &failure,
                content_type,
                |ct| {
                    format!(
                        "Contentful could not find a content type with the ID \"{}\". \
                         Please create a '{}' content type with a 'description' field.",
                        ct, ct
                    )
                },
                "Could not fetch \"About Me\" information from Contentful.",
            )
        })?;

        let Some(entry) = body
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
        else {
            tracing::info!(content_type, "no bio entry found, using placeholder");
            return Ok(BIO_PLACEHOLDER.to_string());
        };

        let includes = body
            .get("includes")
            .map(Includes::from_response)
            .unwrap_or_default();
        let description = entry
            .pointer("/fields/description")
            .unwrap_or(&Value::Null);
        Ok(map_bio_description(description, &includes))
    }

    async fn fetch_asset_url(&self, asset_id: &str) -> String {
        let Some((space, token)) = self.credentials() else {
            tracing::warn!(asset_id, "Contentful credentials are not set, using fallback banner");
            return FALLBACK_BANNER_URL.to_string();
        };

        let url = self.endpoint(space, &["assets", asset_id]);
        match self.get_json(url, token, &[]).await {
            Ok(asset) => asset_file_url(&asset).unwrap_or_else(|| {
                tracing::warn!(asset_id, "asset has no file URL, using fallback banner");
                FALLBACK_BANNER_URL.to_string()
            }),
            Err(failure) => {
                tracing::error!(asset_id, error = %failure.describe(), "failed to fetch asset");
                FALLBACK_BANNER_URL.to_string()
            }
        }
    }

    async fn fetch_content_type(
        &self,
        content_type_id: &str,
    ) -> Result<Vec<ContentTypeField>, CmsError> {
        let (space, token) = self.credentials().ok_or_else(CmsError::missing_credentials)?;

        let url = self.endpoint(space, &["content_types", content_type_id]);
        let body = self.get_json(url, token, &[]).await.map_err(|failure| {
            tracing::error!(
                content_type = content_type_id,
                error = %failure.describe(),
                "failed to fetch content type"
            );
            classify_content_type_failure(&failure, content_type_id)
        })?;

        Ok(parse_content_type_fields(&body))
    }
}
