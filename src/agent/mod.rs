//! Agent client for the hosted analysis model.
//!
//! The service delegates all document intelligence to an external agent
//! endpoint through a single `run(prompt, history, attachments) -> text`
//! call. [`AgentRunner`] is the seam; [`GeminiClient`] is the production
//! implementation against the Gemini `generateContent` API.

pub mod gemini;

pub use gemini::GeminiClient;

use std::io;
use std::path::Path;

use async_trait::async_trait;

use crate::session::ChatMessage;

/// Agent connection and model settings.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Base URL for the agent API.
    pub base_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier (e.g., `gemini-2.0-flash-exp`).
    pub model: String,
}

/// A file attached to an agent call.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Display filename.
    pub filename: String,
    /// MIME type, guessed from the extension.
    pub mime_type: String,
    /// Raw file bytes.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Read a file from disk into an attachment.
    ///
    /// The MIME type is guessed from the extension; unknown extensions
    /// fall back to `application/octet-stream`.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let data = std::fs::read(path)?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let filename = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());

        Ok(Self {
            filename,
            mime_type,
            data,
        })
    }
}

/// A single request to the agent.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// The prompt for this turn.
    pub prompt: String,
    /// Prior conversation turns, replayed for context.
    pub history: Vec<ChatMessage>,
    /// Files attached to this turn.
    pub attachments: Vec<Attachment>,
}

impl AgentRequest {
    /// Build a request with no history or attachments.
    #[must_use]
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

/// Errors that can occur when calling the agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The HTTP request failed (network, TLS, timeout).
    #[error("agent request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint returned a non-success status.
    #[error("agent returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response carried no usable text content.
    #[error("agent response contained no text")]
    EmptyResponse,
}

/// Trait for the external analysis agent.
///
/// Production uses [`GeminiClient`]; tests substitute a mock that returns
/// canned text.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Run one agent turn and return the model's text response.
    async fn run(&self, request: AgentRequest) -> Result<String, AgentError>;
}
