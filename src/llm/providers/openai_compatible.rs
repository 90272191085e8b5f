//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Works against LM Studio, Ollama, llama.cpp server and hosted OpenAI alike.
//! All wire types are private to this module; callers only see
//! [`LlmResponse`]. The reply schema is validated here, once, so the rest of
//! the crate never guesses at fields.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{LlmResponse, LlmUsage, ProviderError};
use crate::session::Message;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// When `api_key` is present it is sent as `Authorization: Bearer <key>`.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Lightweight reachability check.
    ///
    /// Any HTTP response (including 4xx) means the server is reachable; only a
    /// transport failure (connection refused, timeout) is an error.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        let mut req = self.client.head(&self.api_base_url).timeout(PING_TIMEOUT);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req.send()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Request(format!("unreachable: {e}")))
    }

    /// Send the whole conversation, optionally preceded by `system`.
    ///
    /// One round-trip; history lives in the session store, not here.
    pub async fn complete(
        &self,
        messages: &[Message],
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if let Some(sys) = system {
            wire.push(WireMessage { role: "system", content: sys });
        }
        wire.extend(messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: wire,
            temperature: temperature_for(&self.model, self.temperature),
        };

        debug!(
            model = %payload.model,
            temperature = ?payload.temperature,
            messages = payload.messages.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, timeout = e.is_timeout(), "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received LLM response");
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&parsed)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(response = %json, "full LLM response payload");
        }

        into_llm_response(parsed)
    }
}

/// Some models (gpt-5 family, o-series) reject a temperature parameter.
fn temperature_for(model: &str, temperature: f32) -> Option<f32> {
    let bare = model.rsplit('/').next().unwrap_or(model);
    if bare.starts_with("gpt-5") || bare.starts_with("o1") || bare.starts_with("o3") {
        None
    } else {
        Some(temperature)
    }
}

/// Pick the reply text out of the first choice.
///
/// Chat servers put it in `message.content`; completion-style servers in
/// `text`. Anything else is a malformed reply.
fn into_llm_response(parsed: ChatCompletionResponse) -> Result<LlmResponse, ProviderError> {
    let usage = parsed.usage.map(|u| LlmUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.and_then(|m| m.content).or(c.text))
        .ok_or_else(|| ProviderError::Request("missing content in response".into()))?;

    Ok(LlmResponse { text, usage })
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct UsageData {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Structured {
        message: String,
        #[serde(default)]
        code: Option<serde_json::Value>,
    },
    // LM Studio and Ollama sometimes send `{"error": "..."}`.
    Plain(String),
}

/// Return the response if successful, or a structured error built from its body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = format_error_body(status, &body);
    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}

fn format_error_body(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error: ErrorBody::Structured { message, code } }) => {
            let code = code
                .map(|v| match v {
                    serde_json::Value::String(s) => format!(" [code={s}]"),
                    other => format!(" [code={other}]"),
                })
                .unwrap_or_default();
            format!("HTTP {status}{code}: {message}")
        }
        Ok(ErrorEnvelope { error: ErrorBody::Plain(message) }) => format!("HTTP {status}: {message}"),
        Err(_) => format!("HTTP {status}: {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn parse(json: &str) -> ChatCompletionResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn chat_content_extracted_untrimmed() {
        let r = into_llm_response(parse(
            r#"{"choices":[{"message":{"role":"assistant","content":" hi "}}],
                "usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#,
        ))
        .unwrap();
        assert_eq!(r.text, " hi ");
        assert_eq!(r.usage, Some(LlmUsage { input_tokens: 12, output_tokens: 3 }));
    }

    #[test]
    fn completion_text_fallback() {
        let r = into_llm_response(parse(r#"{"choices":[{"text":"legacy"}]}"#)).unwrap();
        assert_eq!(r.text, "legacy");
        assert!(r.usage.is_none());
    }

    #[test]
    fn null_content_without_text_errors() {
        let err = into_llm_response(parse(r#"{"choices":[{"message":{"content":null}}]}"#))
            .unwrap_err();
        assert!(err.to_string().contains("missing content"));
    }

    #[test]
    fn no_choices_errors() {
        assert!(into_llm_response(parse(r#"{"choices":[]}"#)).is_err());
        assert!(into_llm_response(parse(r#"{}"#)).is_err());
    }

    #[test]
    fn request_serialises_roles_and_skips_missing_temperature() {
        let req = ChatCompletionRequest {
            model: "gpt-5-mini",
            messages: vec![
                WireMessage { role: "system", content: "be nice" },
                WireMessage { role: "user", content: "hi" },
            ],
            temperature: temperature_for("gpt-5-mini", 0.7),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "hi");
        assert!(v.get("temperature").is_none());
    }

    #[test]
    fn temperature_kept_for_local_models() {
        assert_eq!(temperature_for("openai/gpt-oss-20b", 0.7), Some(0.7));
        assert_eq!(temperature_for("qwen2.5-7b-instruct", 0.2), Some(0.2));
        assert_eq!(temperature_for("openai/gpt-5", 0.2), None);
    }

    #[test]
    fn structured_error_body() {
        let msg = format_error_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"model not loaded","code":"model_not_found"}}"#,
        );
        assert_eq!(msg, "HTTP 400 Bad Request [code=model_not_found]: model not loaded");
    }

    #[test]
    fn plain_error_body() {
        let msg = format_error_body(StatusCode::NOT_FOUND, r#"{"error":"no such model"}"#);
        assert_eq!(msg, "HTTP 404 Not Found: no such model");
    }

    #[test]
    fn opaque_error_body() {
        let msg = format_error_body(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(msg, "HTTP 502 Bad Gateway: upstream down");
    }

    #[tokio::test]
    async fn ping_unreachable_errors() {
        let p = OpenAiCompatibleProvider::new(
            "http://127.0.0.1:1/v1/chat/completions".into(),
            "m".into(),
            0.0,
            1,
            None,
        )
        .unwrap();
        let err = p.ping().await.unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }
}
