//! JSON API handlers.
//!
//! All endpoints speak JSON and carry an explicit `session_id` field
//! instead of cookie-backed sessions. Missing prerequisites (no document,
//! no portfolio) come back as 400 with an error body; agent failures come
//! back as 502.

pub mod analyze;
pub mod upload;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use serde::Serialize;

use crate::AppState;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload::upload_handler))
        .route("/upload_portfolio", post(upload::upload_portfolio_handler))
        .route("/summarize", post(analyze::summarize_handler))
        .route("/chat", post(analyze::chat_handler))
        .route("/predefined_prompt", post(analyze::predefined_prompt_handler))
        .route("/new_session", post(analyze::new_session_handler))
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API error: a status code plus a JSON error body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// 400 with the given message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 502 for a failed agent call.
    pub fn agent(context: &str, err: &crate::agent::AgentError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: format!("{context}: {err}"),
        }
    }

    /// 500 with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
