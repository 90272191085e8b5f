//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or an explicit `-f` path), then applies
//! `LMCHAT_BIND` and `LMCHAT_LOG_LEVEL` env overrides. When no path is given
//! and the default file is absent, built-in defaults are used so the binary
//! runs out of the box against a local LM Studio.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the axum listener binds to.
    pub bind: String,
}

/// OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature (omitted for models that reject it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Active provider: `"dummy"`, `"openai"`, `"openai-compatible"` or `"lmstudio"`.
    /// Named `default` in the TOML.
    pub provider: String,
    /// Switch to the dummy provider when the runtime is unreachable at startup.
    pub fallback_to_dummy: bool,
    /// Prepended to every outbound request; never stored in the session.
    pub system_prompt: Option<String>,
    pub openai: OpenAiConfig,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Append logs here instead of stderr.
    pub log_file: Option<PathBuf>,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY`, `None` for keyless local runtimes.
    /// Never sourced from TOML.
    pub llm_api_key: Option<String>,
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

impl Default for RawServer {
    fn default() -> Self {
        Self { bind: default_bind(), log_level: default_log_level(), log_file: None }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default = "default_true")]
    fallback_to_dummy: bool,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            fallback_to_dummy: true,
            system_prompt: None,
            openai: RawOpenAiConfig::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

fn default_bind() -> String { "0.0.0.0:5000".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_openai_api_base_url() -> String { "http://127.0.0.1:1234/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "openai/gpt-oss-20b".to_string() }
fn default_openai_temperature() -> f32 { 0.7 }
// Local models on consumer hardware can take minutes per reply.
fn default_openai_timeout_seconds() -> u64 { 300 }
fn default_true() -> bool { true }

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `config_path`, or `config/default.toml`, then apply env overrides.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let bind_override = env::var("LMCHAT_BIND").ok();
    let log_level_override = env::var("LMCHAT_LOG_LEVEL").ok();
    let api_key = env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());

    let path = match config_path {
        Some(p) => Some(PathBuf::from(p)),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            default_path.exists().then_some(default_path)
        }
    };

    let raw = match path {
        Some(p) => read_raw(&p)?,
        None => RawConfig::default(),
    };

    Ok(resolve(raw, bind_override.as_deref(), log_level_override.as_deref(), api_key))
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    bind_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = read_raw(path)?;
    Ok(resolve(raw, bind_override, log_level_override, None))
}

fn read_raw(path: &Path) -> Result<RawConfig, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    toml::from_str(&text)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))
}

fn resolve(
    raw: RawConfig,
    bind_override: Option<&str>,
    log_level_override: Option<&str>,
    llm_api_key: Option<String>,
) -> Config {
    let s = raw.server;
    Config {
        log_level: log_level_override.map(str::to_string).unwrap_or(s.log_level),
        log_file: s.log_file.map(PathBuf::from),
        server: ServerConfig {
            bind: bind_override.map(str::to_string).unwrap_or(s.bind),
        },
        llm: LlmConfig {
            provider: raw.llm.provider,
            fallback_to_dummy: raw.llm.fallback_to_dummy,
            system_prompt: raw.llm.system_prompt.filter(|p| !p.trim().is_empty()),
            openai: OpenAiConfig {
                api_base_url: raw.llm.openai.api_base_url,
                model: raw.llm.openai.model,
                temperature: raw.llm.openai.temperature,
                timeout_seconds: raw.llm.openai.timeout_seconds,
            },
        },
        llm_api_key,
    }
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Config for tests: dummy LLM, ephemeral bind, no API key, no external calls.
    pub fn test_default() -> Self {
        Self {
            log_level: "info".into(),
            log_file: None,
            server: ServerConfig { bind: "127.0.0.1:0".into() },
            llm: LlmConfig {
                provider: "dummy".into(),
                fallback_to_dummy: false,
                system_prompt: None,
                openai: OpenAiConfig {
                    api_base_url: "http://127.0.0.1:1/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            llm_api_key: None,
        }
    }
}
