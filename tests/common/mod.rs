//! In-process mock of the Contentful CDA and Gemini REST APIs.
//!
//! The mock runs on its own thread and runtime so it can serve both async
//! tests and spawned `bylines` processes. Every request path and query is
//! recorded for assertions.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bylines::config::Config;

pub const SPACE: &str = "space1";
pub const TOKEN: &str = "good-token";
pub const API_KEY: &str = "good-key";
pub const ARTICLE_TYPE: &str = "blogPost";

/// Little-endian PCM the mock speech endpoint returns: samples 1, -1.
pub const SPEECH_PCM: [u8; 4] = [1, 0, 255, 255];

#[derive(Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn record(&self, entry: String) {
        self.requests.lock().unwrap().push(entry);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub struct MockApi {
    pub addr: SocketAddr,
    pub recorder: Recorder,
}

impl MockApi {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Config pointing both gateways at the mock, with working credentials.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.cms.base_url = self.base_url();
        config.cms.space_id = Some(SPACE.to_string());
        config.cms.access_token = Some(TOKEN.to_string());
        config.cms.content_type_id = Some(ARTICLE_TYPE.to_string());
        config.cms.max_retries = 0;
        config.cms.timeout_secs = 5;
        config.ai.base_url = format!("{}/v1beta", self.base_url());
        config.ai.api_key = Some(API_KEY.to_string());
        config.ai.timeout_secs = 5;
        config
    }

    /// TOML equivalent of [`config`](Self::config) for spawned binaries.
    pub fn config_toml(&self, storage_path: &std::path::Path) -> String {
        format!(
            r#"[site]
owner_name = "Ada Lovelace"
url = "https://site.test/"

[cms]
base_url = "{base}"
space_id = "{space}"
access_token = "{token}"
content_type_id = "{ct}"
max_retries = 0
timeout_secs = 5

[ai]
base_url = "{base}/v1beta"
api_key = "{key}"
timeout_secs = 5

[storage]
path = "{storage}"
"#,
            base = self.base_url(),
            space = SPACE,
            token = TOKEN,
            ct = ARTICLE_TYPE,
            key = API_KEY,
            storage = storage_path.display()
        )
    }
}

/// Start the mock on 127.0.0.1 with an ephemeral port.
pub fn start_mock() -> MockApi {
    let recorder = Recorder::default();
    let app = Router::new()
        .route(
            "/spaces/{space}/environments/{env}/entries",
            get(handle_entries),
        )
        .route(
            "/spaces/{space}/environments/{env}/assets/{id}",
            get(handle_asset),
        )
        .route(
            "/spaces/{space}/environments/{env}/content_types/{id}",
            get(handle_content_type),
        )
        .route("/v1beta/models/{call}", post(handle_generate))
        .with_state(recorder.clone());

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    MockApi {
        addr: rx.recv().unwrap(),
        recorder,
    }
}

fn cms_error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

fn invalid_token() -> Response {
    cms_error(
        StatusCode::UNAUTHORIZED,
        json!({
            "sys": { "type": "Error", "id": "AccessTokenInvalid" },
            "message": "The access token you sent could not be found or is invalid."
        }),
    )
}

fn not_found() -> Response {
    cms_error(
        StatusCode::NOT_FOUND,
        json!({
            "sys": { "type": "Error", "id": "NotFound" },
            "message": "The resource could not be found."
        }),
    )
}

pub fn articles_fixture() -> Value {
    json!({
        "sys": { "type": "Array" },
        "items": [
            {
                "sys": { "id": "post-2", "type": "Entry" },
                "fields": {
                    "title": "Culture Eats Strategy",
                    "writtendate": "2024-03-05T10:00:00Z",
                    "excerpt": "Why culture matters.",
                    "authors": [{ "sys": { "type": "Link", "linkType": "Entry", "id": "author-1" } }],
                    "tags": ["culture", "strategy"],
                    "body": {
                        "nodeType": "document",
                        "content": [{
                            "nodeType": "paragraph",
                            "content": [{ "nodeType": "text", "value": "Hello world", "marks": [] }]
                        }]
                    }
                }
            },
            { "sys": { "type": "Entry" }, "fields": { "title": "No id" } },
            {
                "sys": { "id": "post-1", "type": "Entry" },
                "fields": {
                    "title": "First Steps",
                    "writtendate": "not a date",
                    "authors": "Jane Roe",
                    "body": "plain text body"
                }
            }
        ],
        "includes": {
            "Entry": [
                { "sys": { "id": "author-1", "type": "Entry" }, "fields": { "name": "Ada Lovelace" } }
            ]
        }
    })
}

fn bio_fixture() -> Value {
    json!({
        "items": [{
            "sys": { "id": "bio-1", "type": "Entry" },
            "fields": {
                "description": {
                    "nodeType": "document",
                    "content": [{
                        "nodeType": "paragraph",
                        "content": [{ "nodeType": "text", "value": "I write about leadership.", "marks": [] }]
                    }]
                }
            }
        }]
    })
}

async fn handle_entries(
    State(recorder): State<Recorder>,
    Path((space, env)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let query = query.unwrap_or_default();
    recorder.record(format!("GET /spaces/{}/environments/{}/entries?{}", space, env, query));

    if !authorized(&headers) {
        return invalid_token();
    }

    match params.get("content_type").map(String::as_str) {
        Some(ARTICLE_TYPE) => Json(articles_fixture()).into_response(),
        Some("aboutMe") => Json(bio_fixture()).into_response(),
        Some("emptyBio") => Json(json!({ "items": [] })).into_response(),
        Some("flaky") => (StatusCode::INTERNAL_SERVER_ERROR, "upstream down").into_response(),
        _ => cms_error(
            StatusCode::BAD_REQUEST,
            json!({
                "sys": { "type": "Error", "id": "InvalidQuery" },
                "details": { "errors": [{ "name": "unknownContentType", "value": "DOESNOTEXIST" }] }
            }),
        ),
    }
}

async fn handle_asset(
    State(recorder): State<Recorder>,
    Path((_space, _env, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    recorder.record(format!("GET asset {}", id));
    if !authorized(&headers) {
        return invalid_token();
    }
    match id.as_str() {
        "nofile" => Json(json!({ "sys": { "id": "nofile" }, "fields": { "title": "x" } })).into_response(),
        "missing" => not_found(),
        other => Json(json!({
            "sys": { "id": other, "type": "Asset" },
            "fields": { "file": { "url": format!("//images.ctfassets.net/{}.jpg", other) } }
        }))
        .into_response(),
    }
}

async fn handle_content_type(
    State(recorder): State<Recorder>,
    Path((_space, _env, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    recorder.record(format!("GET content_type {}", id));
    if !authorized(&headers) {
        return invalid_token();
    }
    if id != ARTICLE_TYPE {
        return not_found();
    }
    Json(json!({
        "sys": { "id": ARTICLE_TYPE, "type": "ContentType" },
        "fields": [
            { "id": "title", "name": "Title", "type": "Symbol" },
            { "id": "writtendate", "name": "Written date", "type": "Date" },
            { "id": "body", "name": "Body", "type": "RichText" }
        ]
    }))
    .into_response()
}

/// Text of the last `contents` turn.
fn last_user_text(body: &Value) -> String {
    body["contents"]
        .as_array()
        .and_then(|c| c.last())
        .and_then(|turn| turn.pointer("/parts/0/text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn text_reply(text: &str) -> Response {
    Json(json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    }))
    .into_response()
}

async fn handle_generate(
    State(recorder): State<Recorder>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    recorder.record(format!("POST {}", call));

    let key_ok = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        == Some(API_KEY);
    if !key_ok {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": 403, "message": "API key not valid." } })),
        )
            .into_response();
    }

    let Some(model) = call.strip_suffix(":generateContent") else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let text = last_user_text(&body);
    if text.contains("fail") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded").into_response();
    }
    if text.contains("silence") {
        return Json(json!({ "candidates": [] })).into_response();
    }

    if model.ends_with("-tts") {
        use base64::Engine as _;
        let data = base64::engine::general_purpose::STANDARD.encode(SPEECH_PCM);
        return Json(json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": { "mimeType": "audio/L16;rate=24000", "data": data } }] } }]
        }))
        .into_response();
    }

    if text.starts_with("Summarize the following article") {
        return text_reply("A short summary.");
    }

    let turns = body["contents"].as_array().map(Vec::len).unwrap_or(0);
    text_reply(&format!("reply to '{}' after {} turn(s)", text, turns))
}
