//! Dummy LLM provider — echoes the latest user message prefixed with `[echo]`.
//! Serves as offline mode when no model runtime is available, and lets tests
//! drive the full chat round-trip without a network.

use crate::llm::{LlmResponse, ProviderError};
use crate::session::{Message, Role};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(
        &self,
        messages: &[Message],
        _system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(LlmResponse { text: format!("[echo] {last_user}"), usage: None })
    }
}
