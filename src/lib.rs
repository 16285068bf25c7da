//! Portfolio Insight
//!
//! A web service that analyzes uploaded financial documents for their
//! potential impact on a selected stock portfolio, delegating the analysis
//! itself to a hosted LLM agent.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server with JSON endpoints
//! - **Extractor**: Best-effort XML-to-text normalization before attachment
//! - **Agent**: Single `run(prompt, attachments) -> text` call to Gemini
//! - **Sessions**: In-memory store keyed by UUID
//!
//! # Modules
//!
//! - [`extract`]: XML document text extraction with graceful fallback
//! - [`agent`]: Agent client trait and Gemini implementation
//! - [`session`]: Session store and per-session analysis state
//! - [`portfolio`]: Predefined portfolios and CSV seeding
//! - [`prompts`]: Prompt templates for the agent

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::map_err_ignore)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod agent;
pub mod api;
pub mod config;
pub mod extract;
pub mod portfolio;
pub mod prompts;
pub mod server;
pub mod session;

use std::sync::Arc;

use agent::AgentRunner;
use config::AppConfig;
use session::SessionStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Agent client for document analysis.
    pub agent: Arc<dyn AgentRunner>,
    /// Session store for analysis state.
    pub sessions: SessionStore,
    /// Global configuration.
    pub config: Arc<AppConfig>,
}
