//! Session store — per-conversation message transcripts.
//!
//! [`SessionStore`] is the contract the chat handler depends on. The only
//! backend today is [`MemorySessionStore`]; a keyed external store (cache or
//! database) can be dropped in behind the same trait for multi-instance
//! deployments.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use memory::MemorySessionStore;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn in a conversation. Serialises as `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Pluggable session storage.
///
/// Every method is a single short critical section; implementations must
/// never hold a lock across an `.await` in the caller. Message lists are
/// returned as snapshots.
pub trait SessionStore: Send + Sync {
    /// Backend name, reported by the health endpoint.
    fn store_type(&self) -> &str;

    /// Resolve `session_id` to its messages.
    ///
    /// An absent or unknown id yields a freshly generated id and an empty list.
    fn get_or_create(&self, session_id: Option<&str>) -> Result<(String, Vec<Message>), AppError>;

    /// Append to the end of the session, creating it if unknown.
    fn append(&self, session_id: &str, message: Message) -> Result<(), AppError>;

    /// Remove and return the last message if it equals `expected`.
    ///
    /// Leaves the session untouched when another request has appended since,
    /// so a failed turn never deletes someone else's answer.
    fn rollback_last(&self, session_id: &str, expected: &Message) -> Result<Option<Message>, AppError>;

    /// Messages of the session; empty for unknown ids.
    fn get(&self, session_id: &str) -> Result<Vec<Message>, AppError>;

    /// Reset the session to an empty list. No-op for unknown ids.
    fn clear(&self, session_id: &str) -> Result<(), AppError>;

    /// Number of live sessions.
    fn len(&self) -> Result<usize, AppError>;
}

/// Generate a new opaque session id.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
