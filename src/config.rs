//! TOML configuration with environment overrides.
//!
//! Every section is optional; a missing file yields [`Config::minimal`].
//! Identifiers and secrets can also come from the environment, which wins
//! over the file:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `CONTENTFUL_SPACE_ID` | `cms.space_id` |
//! | `CONTENTFUL_ACCESS_TOKEN` | `cms.access_token` |
//! | `CONTENTFUL_CONTENT_TYPE_ID` | `cms.content_type_id` |
//! | `GEMINI_API_KEY`, then `API_KEY` | `ai.api_key` |
//!
//! Missing CMS or AI settings are not configuration errors here: each
//! component decides how to degrade (see [`crate::cms`] and [`crate::assist`]).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Display name on the bio.
    #[serde(default = "default_owner_name")]
    pub owner_name: String,
    /// Public origin plus path, used for share links.
    #[serde(default = "default_site_url")]
    pub url: String,
    #[serde(default = "default_banner_asset")]
    pub banner_asset_id: String,
    #[serde(default = "default_bio_image_asset")]
    pub bio_image_asset_id: String,
    /// OS-level dark-mode preference, used when no theme is stored.
    #[serde(default = "default_true")]
    pub prefers_dark: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            owner_name: default_owner_name(),
            url: default_site_url(),
            banner_asset_id: default_banner_asset(),
            bio_image_asset_id: default_bio_image_asset(),
            prefers_dark: true,
        }
    }
}

fn default_owner_name() -> String {
    "Vikas Verma".to_string()
}
fn default_site_url() -> String {
    "http://localhost:8787/".to_string()
}
fn default_banner_asset() -> String {
    "4bcVl2MVxuW5I5GDJNhmur".to_string()
}
fn default_bio_image_asset() -> String {
    "Pg83pwXzFy1X5DozK4XZm".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct CmsConfig {
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Content type of article entries.
    #[serde(default)]
    pub content_type_id: Option<String>,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_bio_content_type")]
    pub bio_content_type: String,
    #[serde(default = "default_cms_base_url")]
    pub base_url: String,
    #[serde(default = "default_cms_timeout")]
    pub timeout_secs: u64,
    /// Retries for rate-limited (429) and 5xx responses.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            space_id: None,
            access_token: None,
            content_type_id: None,
            environment: default_environment(),
            bio_content_type: default_bio_content_type(),
            base_url: default_cms_base_url(),
            timeout_secs: default_cms_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_environment() -> String {
    "master".to_string()
}
fn default_bio_content_type() -> String {
    "aboutMe".to_string()
}
fn default_cms_base_url() -> String {
    "https://cdn.contentful.com".to_string()
}
fn default_cms_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_speech_model")]
    pub speech_model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            text_model: default_text_model(),
            speech_model: default_speech_model(),
            voice: default_voice(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}
fn default_voice() -> String {
    "Kore".to_string()
}
fn default_ai_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// JSON file backing local durable storage (the theme preference).
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/bylines-state.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

impl Config {
    /// Defaults plus environment overrides, for running without a file.
    pub fn minimal() -> Self {
        let mut config = Self::default();
        config.apply_env(|k| std::env::var(k).ok());
        config
    }

    /// Apply environment overrides using `lookup` (empty values are ignored).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CONTENTFUL_SPACE_ID") {
            self.cms.space_id = Some(v);
        }
        if let Some(v) = get("CONTENTFUL_ACCESS_TOKEN") {
            self.cms.access_token = Some(v);
        }
        if let Some(v) = get("CONTENTFUL_CONTENT_TYPE_ID") {
            self.cms.content_type_id = Some(v);
        }
        if let Some(v) = get("GEMINI_API_KEY").or_else(|| get("API_KEY")) {
            self.ai.api_key = Some(v);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.site.owner_name.trim().is_empty() {
            anyhow::bail!("site.owner_name must not be empty");
        }
        if self.cms.timeout_secs == 0 {
            anyhow::bail!("cms.timeout_secs must be > 0");
        }
        if self.ai.timeout_secs == 0 {
            anyhow::bail!("ai.timeout_secs must be > 0");
        }
        if self.server.bind.trim().is_empty() {
            anyhow::bail!("server.bind must not be empty");
        }
        Ok(())
    }
}

/// Parse configuration text, then apply environment overrides and validate.
pub fn parse_config(content: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.apply_env(lookup);
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content, |k| std::env::var(k).ok())
}

/// Load the file if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}
