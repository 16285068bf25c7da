//! Gemini `generateContent` client.
//!
//! Non-streaming driver for the Google Generative Language API. History is
//! replayed into `contents`, attachments ride inline as base64, and the
//! financial-analyst system instruction is attached to every call.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use crate::prompts::ANALYST_INSTRUCTIONS;
use crate::session::ChatRole;

use super::{AgentError, AgentRequest, AgentRunner, AgentSettings};

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    settings: AgentSettings,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish()
    }
}

impl GeminiClient {
    /// Create a new client with the given settings.
    #[must_use]
    pub fn new(settings: AgentSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl AgentRunner for GeminiClient {
    async fn run(&self, request: AgentRequest) -> Result<String, AgentError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        );

        let body = build_request_body(&request);

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = resp.json().await?;
        extract_text(&value).ok_or(AgentError::EmptyResponse)
    }
}

/// Build the `generateContent` request body.
fn build_request_body(request: &AgentRequest) -> Value {
    let mut contents: Vec<Value> = request
        .history
        .iter()
        .map(|msg| {
            let role = match msg.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            };
            json!({ "role": role, "parts": [{ "text": msg.content }] })
        })
        .collect();

    let mut parts: Vec<Value> = vec![json!({ "text": request.prompt })];
    for attachment in &request.attachments {
        parts.push(json!({
            "inline_data": {
                "mime_type": attachment.mime_type,
                "data": BASE64.encode(&attachment.data),
            }
        }));
    }
    contents.push(json!({ "role": "user", "parts": parts }));

    json!({
        "system_instruction": { "parts": [{ "text": ANALYST_INSTRUCTIONS }] },
        "contents": contents,
    })
}

/// Pull the concatenated text parts out of the first candidate.
fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() { None } else { Some(text) }
}
