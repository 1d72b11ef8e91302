//! AI assists over the Gemini `generateContent` REST API.
//!
//! Three operations, each with its own degrade policy:
//!
//! | Operation | No API key | Request failure |
//! |-----------|------------|-----------------|
//! | [`summarize`](AssistGateway::summarize) | fixed "not configured" message | apology text |
//! | [`synthesize_speech`](AssistGateway::synthesize_speech) | `None` | `None` |
//! | [`chat`](AssistGateway::chat) | `Err(MissingApiKey)` | `Err(..)`, session kept |
//!
//! Requests go to `{base_url}/models/{model}:generateContent` with the key
//! in the `x-goog-api-key` header. Article HTML is stripped to plain text
//! before it is sent.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use bylines_core::markup::strip_markup;

use crate::config::AiConfig;
use crate::error::AssistError;

/// Returned by [`AssistGateway::summarize`] on any request failure.
pub const SUMMARY_APOLOGY: &str =
    "Sorry, I couldn't summarize the article at this time. Please try again later.";

/// First message shown by the chat widget.
pub const CHAT_GREETING: &str =
    "Hello! How can I help you learn more about leadership, culture, or strategy today?";

/// Inline reply shown when a chat turn fails.
pub const CHAT_ERROR_REPLY: &str = "Apologies, I encountered an error. Please try again.";

/// The summarization prompt for already-stripped article text.
pub fn summary_prompt(text: &str) -> String {
    format!(
        "Summarize the following article in three concise sentences:\n\n---\n{}\n---",
        text
    )
}

/// System instruction for the site assistant.
pub fn persona_instruction(owner_name: &str) -> String {
    format!(
        "You are the assistant on {owner}'s personal website. {owner} writes about \
         leadership, culture, and strategy. Answer visitors' questions about these topics \
         and about {owner}'s work in a friendly, concise way. If you do not know something \
         about {owner}, say so rather than guessing.",
        owner = owner_name
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// A multi-turn conversation: the system instruction plus completed turns.
///
/// Only successful exchanges are recorded, so a failed turn can simply be
/// retried with the same session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub system_instruction: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            history: Vec::new(),
        }
    }

    /// Request body for the next turn: instruction, history, then `message`.
    fn request_body(&self, message: &str) -> Value {
        let mut contents: Vec<Value> = self
            .history
            .iter()
            .map(|turn| json!({ "role": turn.role, "parts": [{ "text": turn.text }] }))
            .collect();
        contents.push(json!({ "role": ChatRole::User, "parts": [{ "text": message }] }));

        json!({
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
            "contents": contents,
        })
    }
}

/// Concatenated text parts of the first candidate, if non-blank.
fn parse_text_response(json: &Value) -> Option<String> {
    let parts = json.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Base64 audio payload of the first candidate's first part.
fn parse_audio_response(json: &Value) -> Option<&str> {
    json.pointer("/candidates/0/content/parts/0/inlineData/data")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Client for the generative AI API.
pub struct AssistGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    text_model: String,
    speech_model: String,
    voice: String,
    persona: String,
}

impl AssistGateway {
    pub fn from_config(config: &AiConfig, owner_name: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            text_model: config.text_model.clone(),
            speech_model: config.speech_model.clone(),
            voice: config.voice.clone(),
            persona: persona_instruction(owner_name),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// A fresh session with the site persona.
    pub fn new_chat_session(&self) -> ChatSession {
        ChatSession::new(self.persona.clone())
    }

    async fn generate(&self, model: &str, body: &Value) -> Result<Value, AssistError> {
        let api_key = self.api_key.as_deref().ok_or(AssistError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        tracing::debug!(model, "AI request");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AssistError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AssistError::Request(format!("HTTP {}: {}", status, body_text)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AssistError::Request(format!("invalid response: {}", e)))
    }

    /// Summarize an article in three sentences, as an error-typed result.
    pub async fn try_summarize(&self, article_html: &str) -> Result<String, AssistError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": summary_prompt(&strip_markup(article_html)) }] }]
        });
        let json = self.generate(&self.text_model, &body).await?;
        parse_text_response(&json).ok_or(AssistError::EmptyResponse("text"))
    }

    /// Summarize an article. Always returns displayable text.
    pub async fn summarize(&self, article_html: &str) -> String {
        match self.try_summarize(article_html).await {
            Ok(summary) => summary,
            Err(AssistError::MissingApiKey) => AssistError::MissingApiKey.to_string(),
            Err(err) => {
                tracing::error!(error = %err, "error summarizing article");
                SUMMARY_APOLOGY.to_string()
            }
        }
    }

    /// Narrate an article. Returns raw 16-bit LE PCM (24 kHz mono), or
    /// `None` on any failure.
    pub async fn synthesize_speech(&self, article_html: &str) -> Option<Vec<u8>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": strip_markup(article_html) }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": self.voice } }
                }
            }
        });

        let json = match self.generate(&self.speech_model, &body).await {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(error = %err, "error generating article audio");
                return None;
            }
        };

        let Some(data) = parse_audio_response(&json) else {
            tracing::error!("speech response contained no audio");
            return None;
        };

        match STANDARD.decode(data) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::error!(error = %e, "speech response audio is not valid base64");
                None
            }
        }
    }

    /// Send one chat message, creating the session on first use.
    ///
    /// On success both turns are appended to the session. On failure the
    /// session is left as it was.
    pub async fn chat(
        &self,
        session: &mut Option<ChatSession>,
        message: &str,
    ) -> Result<String, AssistError> {
        if self.api_key.is_none() {
            return Err(AssistError::MissingApiKey);
        }

        let session = session.get_or_insert_with(|| self.new_chat_session());
        let body = session.request_body(message);

        let json = self.generate(&self.text_model, &body).await.inspect_err(|err| {
            tracing::error!(error = %err, "chat request failed");
        })?;
        let reply = parse_text_response(&json).ok_or(AssistError::EmptyResponse("reply"))?;

        session.history.push(ChatTurn {
            role: ChatRole::User,
            text: message.to_string(),
        });
        session.history.push(ChatTurn {
            role: ChatRole::Model,
            text: reply.clone(),
        });
        Ok(reply)
    }
}
