//! Analysis session and session storage.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::portfolio::PortfolioSelection;

/// Default session timeout (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Role of a conversation message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// User message (prompt sent to the agent).
    User,
    /// Agent response.
    Model,
}

/// One exchange in the session's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the message.
    pub role: ChatRole,
    /// Text content.
    pub content: String,
}

/// The financial document a session is analyzing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    /// Path on local disk.
    pub path: PathBuf,
    /// Original (sanitized) filename.
    pub filename: String,
}

/// A single analysis session.
///
/// Sessions hold the uploaded document, the selected portfolio, and the
/// conversation history, and provide methods for recording agent exchanges.
#[derive(Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Unique session identifier.
    id: String,
    /// Conversation messages replayed into agent calls.
    messages: RwLock<Vec<ChatMessage>>,
    /// Uploaded financial document, if any.
    document: RwLock<Option<UploadedDocument>>,
    /// Selected portfolio, if any.
    portfolio: RwLock<Option<PortfolioSelection>>,
    /// Whether the document has been through a summarize call.
    analyzed: RwLock<bool>,
    /// Session creation time.
    created_at: DateTime<Utc>,
    /// Last activity time.
    last_activity: RwLock<DateTime<Utc>>,
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Session {
    /// Create a new session with the given ID.
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(SessionInner {
                id,
                messages: RwLock::new(Vec::new()),
                document: RwLock::new(None),
                portfolio: RwLock::new(None),
                analyzed: RwLock::new(false),
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Record the uploaded financial document.
    pub fn set_document(&self, document: UploadedDocument) {
        let mut guard = self.inner.document.write().unwrap();
        *guard = Some(document);
        drop(guard);
        *self.inner.analyzed.write().unwrap() = false;
        self.touch();
    }

    /// Get the uploaded document if one is set.
    #[must_use]
    pub fn document(&self) -> Option<UploadedDocument> {
        self.inner.document.read().unwrap().clone()
    }

    /// Record the selected portfolio.
    pub fn set_portfolio(&self, portfolio: PortfolioSelection) {
        let mut guard = self.inner.portfolio.write().unwrap();
        *guard = Some(portfolio);
        drop(guard);
        self.touch();
    }

    /// Get the selected portfolio if one is set.
    #[must_use]
    pub fn portfolio(&self) -> Option<PortfolioSelection> {
        self.inner.portfolio.read().unwrap().clone()
    }

    /// Mark the current document as analyzed.
    pub fn mark_analyzed(&self) {
        *self.inner.analyzed.write().unwrap() = true;
        self.touch();
    }

    /// Whether the current document has been analyzed at least once.
    #[must_use]
    pub fn is_analyzed(&self) -> bool {
        *self.inner.analyzed.read().unwrap()
    }

    /// Add a user message to the conversation.
    pub fn add_user_message(&self, content: impl Into<String>) {
        self.add_message(ChatMessage {
            role: ChatRole::User,
            content: content.into(),
        });
    }

    /// Add an agent response to the conversation.
    pub fn add_model_message(&self, content: impl Into<String>) {
        self.add_message(ChatMessage {
            role: ChatRole::Model,
            content: content.into(),
        });
    }

    /// Add a message to the conversation.
    pub fn add_message(&self, message: ChatMessage) {
        let mut guard = self.inner.messages.write().unwrap();
        guard.push(message);
        drop(guard);
        self.touch();
    }

    /// Get all messages in the conversation.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.messages.read().unwrap().clone()
    }

    /// Update the last activity timestamp.
    fn touch(&self) {
        let mut guard = self.inner.last_activity.write().unwrap();
        *guard = Utc::now();
    }

    /// When the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Check if the session has been inactive longer than the timeout.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self.inner.last_activity.read().unwrap();
        let now = Utc::now();
        if let Ok(duration) = (now - last).to_std() {
            duration > timeout
        } else {
            // Negative duration means clock skew or "last" is in future.
            false
        }
    }
}

/// Thread-safe store for sessions.
///
/// Provides the `get_or_create(session_id)` contract the handlers rely on,
/// plus creation and expiry cleanup.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Create a new session with a fresh UUID and return it.
    #[must_use]
    pub fn create(&self) -> Session {
        let id = Uuid::new_v4().to_string();
        self.create_with_id(id)
    }

    /// Create a new session with a specific ID.
    #[must_use]
    pub fn create_with_id(&self, id: impl Into<String>) -> Session {
        let id = id.into();
        let session = Session::new(id.clone());
        let mut guard = self.inner.sessions.write().unwrap();
        guard.insert(id, session.clone());
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        let guard = self.inner.sessions.read().unwrap();
        guard.get(id).cloned()
    }

    /// Get a session by ID, creating it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> Session {
        // Try read-only first
        {
            let guard = self.inner.sessions.read().unwrap();
            if let Some(session) = guard.get(id) {
                return session.clone();
            }
        }

        // Create if not exists
        self.create_with_id(id)
    }

    /// Remove a session by ID.
    pub fn remove(&self, id: &str) -> Option<Session> {
        let mut guard = self.inner.sessions.write().unwrap();
        guard.remove(id)
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.read().unwrap().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.inner.sessions.write().unwrap();
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}
