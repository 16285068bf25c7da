//! Session and analysis-state management.
//!
//! This module provides in-memory session storage for managing analysis
//! state across multiple requests. Sessions are identified by UUID and carry
//! the uploaded document, the selected portfolio, and the conversation
//! history replayed into agent calls.
//!
//! # Architecture
//!
//! - [`Session`]: Represents a single analysis session
//! - [`SessionStore`]: Thread-safe store with a `get_or_create` contract
//!
//! # Example
//!
//! ```rust
//! use portfolio_insight::session::SessionStore;
//!
//! let store = SessionStore::new();
//! let session = store.create();
//! session.add_user_message("Analyze this filing.");
//!
//! assert_eq!(session.messages().len(), 1);
//! ```

mod thread;

pub use thread::{
    ChatMessage, ChatRole, DEFAULT_SESSION_TIMEOUT, Session, SessionStore, UploadedDocument,
};
