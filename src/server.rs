//! JSON HTTP API.
//!
//! Serves the loaded site content and the AI assists to a browser front
//! end. Content is loaded per request, so edits in the CMS show up without
//! a restart.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/content` | Articles, bio and banner in one document |
//! | `GET`  | `/api/content-types/{id}` | Content-model inspector |
//! | `POST` | `/api/summarize` | `{ "content" }` → `{ "summary" }` |
//! | `POST` | `/api/speech` | `{ "content" }` → base64 PCM |
//! | `POST` | `/api/chat` | `{ "message", "session"? }` → `{ "reply", "session" }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "auth", "message": "Your Contentful access token is invalid. ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `schema` (404 on the inspector, 502
//! otherwise), `configuration` (503), `auth` (502), `connection` (502),
//! `assist` (502, or 503 without an API key).
//!
//! A failed `/api/content` also carries a `diagnosis` object with the
//! content-model inspector output for the configured content type.
//!
//! # Chat sessions
//!
//! The server is stateless: the client sends back the `session` it got
//! from the previous reply. A failed turn leaves the client's session
//! untouched, so it can simply retry.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use bylines_core::audio::{SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
use bylines_core::models::{ContentTypeField, SiteContent};

use crate::assist::{AssistGateway, ChatSession};
use crate::cms::{ContentGateway, ContentSource};
use crate::config::Config;
use crate::error::{AssistError, CmsError};
use crate::site::{diagnose, load_site, Diagnosis};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    content: Arc<dyn ContentSource>,
    assist: Arc<AssistGateway>,
}

impl AppState {
    pub fn new(config: Config, content: Arc<dyn ContentSource>, assist: AssistGateway) -> Self {
        Self {
            config: Arc::new(config),
            content,
            assist: Arc::new(assist),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let content = ContentGateway::from_config(&config.cms)?;
        let assist = AssistGateway::from_config(&config.ai, &config.site.owner_name)?;
        Ok(Self::new(config.clone(), Arc::new(content), assist))
    }
}

/// All routes with permissive CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/content", get(handle_content))
        .route("/api/content-types/{id}", get(handle_content_type))
        .route("/api/summarize", post(handle_summarize))
        .route("/api/speech", post(handle_speech))
        .route("/api/chat", post(handle_chat))
        .layer(cors)
        .with_state(state)
}

/// Bind `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("Bylines API listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnosis: Option<Diagnosis>,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    diagnosis: Option<Diagnosis>,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
            diagnosis: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
            diagnosis: self.diagnosis,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

impl From<CmsError> for AppError {
    fn from(err: CmsError) -> Self {
        let status = match err {
            CmsError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        AppError::new(status, err.code(), err.to_string())
    }
}

impl From<AssistError> for AppError {
    fn from(err: AssistError) -> Self {
        let status = match err {
            AssistError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        AppError::new(status, "assist", err.to_string())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/content ============

async fn handle_content(State(state): State<AppState>) -> Result<Json<SiteContent>, AppError> {
    match load_site(state.content.as_ref(), &state.config.site).await {
        Ok(content) => Ok(Json(content)),
        Err(err) => {
            tracing::error!(error = %err, "failed to load content");
            let diagnosis = diagnose(state.content.as_ref(), &err).await;
            let mut app_err = AppError::from(err);
            app_err.diagnosis = Some(diagnosis);
            Err(app_err)
        }
    }
}

// ============ GET /api/content-types/{id} ============

#[derive(Serialize)]
struct ContentTypeResponse {
    id: String,
    fields: Vec<ContentTypeField>,
}

async fn handle_content_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContentTypeResponse>, AppError> {
    match state.content.fetch_content_type(&id).await {
        Ok(fields) => Ok(Json(ContentTypeResponse { id, fields })),
        Err(err @ CmsError::Schema { .. }) => Err(AppError::new(
            StatusCode::NOT_FOUND,
            err.code(),
            err.to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

// ============ POST /api/summarize, /api/speech ============

#[derive(Deserialize)]
struct ArticleRequest {
    /// Article HTML (or plain text).
    content: String,
}

impl ArticleRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.content.trim().is_empty() {
            return Err(bad_request("content must not be empty"));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

async fn handle_summarize(
    State(state): State<AppState>,
    Json(req): Json<ArticleRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    req.validate()?;
    Ok(Json(SummaryResponse {
        summary: state.assist.summarize(&req.content).await,
    }))
}

#[derive(Serialize)]
struct SpeechResponse {
    /// Base64 16-bit little-endian PCM.
    audio: String,
    sample_rate: u32,
    channels: u16,
}

async fn handle_speech(
    State(state): State<AppState>,
    Json(req): Json<ArticleRequest>,
) -> Result<Json<SpeechResponse>, AppError> {
    req.validate()?;
    if !state.assist.has_api_key() {
        return Err(AssistError::MissingApiKey.into());
    }
    let pcm = state
        .assist
        .synthesize_speech(&req.content)
        .await
        .ok_or(AssistError::EmptyResponse("audio"))?;

    Ok(Json(SpeechResponse {
        audio: STANDARD.encode(pcm),
        sample_rate: SPEECH_SAMPLE_RATE,
        channels: SPEECH_CHANNELS,
    }))
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    session: Option<ChatSession>,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    session: ChatSession,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let mut session = req.session;
    let reply = state.assist.chat(&mut session, &req.message).await?;

    match session {
        Some(session) => Ok(Json(ChatResponse { reply, session })),
        None => Err(AssistError::EmptyResponse("session").into()),
    }
}
