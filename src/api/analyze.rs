//! Analysis, chat, and session handlers.
//!
//! Every handler checks the same prerequisites the browser flow
//! establishes: a financial document in the session and a selected
//! portfolio. The agent call itself is a single non-streaming exchange.

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::agent::{AgentRequest, Attachment};
use crate::extract::text_path_for_analysis;
use crate::portfolio::PortfolioSelection;
use crate::prompts::{self, PromptKind};
use crate::session::Session;

use super::ApiError;

/// Request body for the analysis endpoints.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Session carrying the uploaded document and portfolio.
    pub session_id: String,
    /// User message (optional extra context for summarize).
    #[serde(default)]
    pub message: Option<String>,
    /// Predefined prompt type (for /api/predefined_prompt).
    #[serde(default, rename = "type")]
    pub prompt_type: Option<String>,
}

/// Response from the analysis endpoints.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Response for /api/new_session.
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub success: bool,
    pub session_id: String,
    pub message: String,
}

/// Look up the session and verify it holds a document and a portfolio.
fn analysis_context(
    state: &AppState,
    session_id: &str,
    missing_document: &str,
    missing_portfolio: &str,
) -> Result<(Session, PortfolioSelection), ApiError> {
    let session = state.sessions.get_or_create(session_id);

    if session.document().is_none() {
        return Err(ApiError::bad_request(missing_document));
    }
    let Some(portfolio) = session.portfolio() else {
        return Err(ApiError::bad_request(missing_portfolio));
    };

    Ok((session, portfolio))
}

/// Attach the session's document if it still exists on disk.
fn document_attachments(session: &Session, convert_xml: bool) -> Vec<Attachment> {
    let Some(document) = session.document() else {
        return Vec::new();
    };
    if !document.path.exists() {
        tracing::warn!(
            name: "analyze.document.missing",
            session_id = %session.id(),
            path = %document.path.display(),
            "Uploaded document no longer on disk, proceeding without attachment"
        );
        return Vec::new();
    }

    let path = if convert_xml {
        text_path_for_analysis(&document.path)
    } else {
        document.path.clone()
    };

    match Attachment::from_path(&path) {
        Ok(attachment) => vec![attachment],
        Err(err) => {
            tracing::warn!(
                name: "analyze.attachment.failed",
                path = %path.display(),
                error = %err,
                "Failed to read attachment, proceeding without it"
            );
            Vec::new()
        }
    }
}

/// Run one agent exchange and record it in the session history.
async fn run_exchange(
    state: &AppState,
    session: &Session,
    prompt: String,
    attachments: Vec<Attachment>,
    context: &str,
) -> Result<String, ApiError> {
    let request = AgentRequest {
        prompt: prompt.clone(),
        history: session.messages(),
        attachments,
    };

    let response = state
        .agent
        .run(request)
        .await
        .map_err(|e| ApiError::agent(context, &e))?;

    session.add_user_message(prompt);
    session.add_model_message(response.clone());
    Ok(response)
}

/// POST /api/summarize - Analyze the uploaded document against the portfolio.
pub async fn summarize_handler(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let (session, portfolio) = analysis_context(
        &state,
        &req.session_id,
        "No financial document uploaded",
        "No portfolio selected",
    )?;

    // XML filings are normalized to text before attachment.
    let attachments = document_attachments(&session, true);
    let prompt = prompts::analysis_prompt(&portfolio, req.message.as_deref().unwrap_or(""));

    let summary = run_exchange(&state, &session, prompt, attachments, "Analysis failed").await?;
    session.mark_analyzed();

    tracing::info!(
        name: "analyze.summarize.completed",
        session_id = %session.id(),
        portfolio = %portfolio.label(),
        "Document analysis completed"
    );

    Ok(Json(AnalyzeResponse {
        success: true,
        session_id: session.id().to_string(),
        summary: Some(summary),
        response: None,
        kind: "analysis",
    }))
}

/// POST /api/chat - Free-form follow-up about the analyzed document.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let (session, portfolio) = analysis_context(
        &state,
        &req.session_id,
        "Please upload a financial document first!",
        "Please select a portfolio first!",
    )?;

    let message = req.message.unwrap_or_default();
    if message.is_empty() {
        return Err(ApiError::bad_request("No message provided"));
    }

    let attachments = document_attachments(&session, false);
    let prompt = prompts::chat_prompt(&portfolio, &message);

    let response = run_exchange(&state, &session, prompt, attachments, "Chat error").await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        session_id: session.id().to_string(),
        summary: None,
        response: Some(response),
        kind: "chat",
    }))
}

/// POST /api/predefined_prompt - Run one of the canned follow-up prompts.
pub async fn predefined_prompt_handler(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let (session, portfolio) = analysis_context(
        &state,
        &req.session_id,
        "Please upload a financial document first!",
        "Please select a portfolio first!",
    )?;

    let kind: PromptKind = req
        .prompt_type
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid prompt type"))?;

    let attachments = document_attachments(&session, false);
    let prompt = prompts::predefined_prompt(kind, &portfolio);

    let response = run_exchange(&state, &session, prompt, attachments, "Prompt error").await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        session_id: session.id().to_string(),
        summary: None,
        response: Some(response),
        kind: "predefined",
    }))
}

/// Request body for /api/new_session.
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    /// Previous session to discard, if any.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// POST /api/new_session - Discard state and mint a fresh session.
pub async fn new_session_handler(
    State(state): State<AppState>,
    body: Option<Json<NewSessionRequest>>,
) -> Json<NewSessionResponse> {
    if let Some(Json(req)) = body {
        if let Some(old) = req.session_id.as_deref() {
            state.sessions.remove(old);
        }
    }

    let session = state.sessions.create();
    tracing::info!(
        name: "session.created",
        session_id = %session.id(),
        "New session created"
    );

    Json(NewSessionResponse {
        success: true,
        session_id: session.id().to_string(),
        message: "New session created".into(),
    })
}
