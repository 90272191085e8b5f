//! Chat request handling — one user turn in, one assistant turn out.
//!
//! [`ChatService`] owns the session store and the model provider. A turn
//! appends the user message, sends the whole transcript to the model,
//! normalizes the reply and appends it. If anything after the user append
//! fails, the user message is rolled back so the stored history never ends
//! in an unanswered user turn.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::llm::{LlmProvider, ProviderError};
use crate::normalize::normalize;
use crate::session::{Message, SessionStore};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] AppError),
}

impl ChatError {
    /// `true` for errors caused by the request itself rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ChatError::EmptyMessage)
    }
}

/// Result of a successful turn.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub session_id: String,
    pub response: String,
}

/// Shared chat capability. Cheap to clone.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn SessionStore>,
    provider: LlmProvider,
    system_prompt: Option<Arc<str>>,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: LlmProvider,
        system_prompt: Option<String>,
    ) -> Self {
        Self { store, provider, system_prompt: system_prompt.map(Arc::from) }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    /// Run one chat turn for `message` in `session_id` (created when absent or unknown).
    pub async fn send(&self, message: &str, session_id: Option<&str>) -> Result<ChatReply, ChatError> {
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let (session_id, _) = self.store.get_or_create(session_id)?;
        let user_turn = Message::user(message);
        self.store.append(&session_id, user_turn.clone())?;

        match self.complete_turn(&session_id).await {
            Ok(response) => {
                info!(%session_id, response_len = response.len(), "chat turn complete");
                Ok(ChatReply { session_id, response })
            }
            Err(e) => {
                warn!(%session_id, error = %e, "chat turn failed, rolling back user message");
                match self.store.rollback_last(&session_id, &user_turn) {
                    Ok(Some(_)) => {}
                    Ok(None) => warn!(%session_id, "user message no longer last, left in place"),
                    Err(rb) => warn!(%session_id, error = %rb, "rollback failed"),
                }
                Err(e)
            }
        }
    }

    async fn complete_turn(&self, session_id: &str) -> Result<String, ChatError> {
        let history = self.store.get(session_id)?;
        debug!(%session_id, turns = history.len(), provider = self.provider.name(), "calling model");

        let raw = self
            .provider
            .complete(&history, self.system_prompt.as_deref())
            .await?;
        if let Some(usage) = raw.usage {
            debug!(
                %session_id,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "model usage"
            );
        }

        let response = normalize(&raw.text);
        self.store.append(session_id, Message::assistant(response.clone()))?;
        Ok(response)
    }

    /// Messages of `session_id`; empty for unknown ids.
    pub fn history(&self, session_id: &str) -> Result<Vec<Message>, AppError> {
        self.store.get(session_id)
    }

    /// Reset `session_id` to an empty transcript.
    pub fn clear(&self, session_id: &str) -> Result<(), AppError> {
        self.store.clear(session_id)?;
        info!(%session_id, "history cleared");
        Ok(())
    }
}
