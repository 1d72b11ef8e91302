//! Error types for the CMS and AI gateways.
//!
//! Messages are written for the site owner: each one names the setting to
//! check, since they are shown verbatim on the error view.

/// A content-gateway failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CmsError {
    /// Required identifiers or credentials are not configured.
    #[error("{0}")]
    Configuration(String),

    /// The CMS rejected the access token.
    #[error("Your Contentful access token is invalid. Please check `CONTENTFUL_ACCESS_TOKEN`.")]
    Auth,

    /// The CMS does not know the requested content type.
    #[error("{message}")]
    Schema {
        content_type: String,
        message: String,
    },

    /// Anything else: transport failures, unexpected statuses or bodies.
    #[error("{0}")]
    Connection(String),
}

impl CmsError {
    pub(crate) fn missing_credentials() -> Self {
        Self::Configuration(
            "Contentful credentials are not set. Please set `CONTENTFUL_SPACE_ID` and \
             `CONTENTFUL_ACCESS_TOKEN`."
                .to_string(),
        )
    }

    pub(crate) fn missing_content_type() -> Self {
        Self::Configuration(
            "Contentful content type ID is not set. Please set `CONTENTFUL_CONTENT_TYPE_ID`."
                .to_string(),
        )
    }

    /// Stable machine-readable code, used by the JSON API.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Auth => "auth",
            Self::Schema { .. } => "schema",
            Self::Connection(_) => "connection",
        }
    }
}

/// An AI-assist failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistError {
    #[error("API key is not configured. Please set the API_KEY environment variable.")]
    MissingApiKey,

    #[error("AI request failed: {0}")]
    Request(String),

    /// The call succeeded but carried no usable payload.
    #[error("AI response contained no {0}")]
    EmptyResponse(&'static str),
}
