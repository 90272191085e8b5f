//! lmchat — server entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config) and init logger
//!   4. Build the LLM provider; ping it, falling back to dummy if configured
//!   5. Spawn Ctrl-C → shutdown signal watcher
//!   6. Serve HTTP until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lmchat::chat::ChatService;
use lmchat::config::{self, Config};
use lmchat::error::AppError;
use lmchat::llm::{LlmProvider, providers};
use lmchat::logger;
use lmchat::server::{self, AppState};
use lmchat::session::MemorySessionStore;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — the file is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    logger::parse_level(&config.log_level)?;
    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();
    logger::init(effective_log_level, force_cli_level, config.log_file.as_deref())?;

    info!(
        bind = %config.server.bind,
        provider = %config.llm.provider,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let provider = build_provider(&config).await?;
    let chat = ChatService::new(
        Arc::new(MemorySessionStore::new()),
        provider,
        config.llm.system_prompt.clone(),
    );

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    server::serve(&config.server.bind, AppState::new(chat), shutdown).await
}

/// Build the configured provider and check the runtime is reachable.
///
/// An unreachable runtime is not fatal: it may be started later. With
/// `fallback_to_dummy` the server switches to echo replies instead.
async fn build_provider(config: &Config) -> Result<LlmProvider, AppError> {
    let provider = providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;

    if let LlmProvider::OpenAiCompatible(p) = &provider {
        match provider.ping().await {
            Ok(()) => info!(url = %p.api_base_url(), model = %p.model(), "model runtime reachable"),
            Err(e) if config.llm.fallback_to_dummy => {
                warn!(url = %p.api_base_url(), error = %e, "model runtime unreachable — falling back to dummy provider");
                return Ok(LlmProvider::Dummy(providers::dummy::DummyProvider));
            }
            Err(e) => warn!(url = %p.api_base_url(), error = %e, "model runtime unreachable — requests will fail until it is up"),
        }
    }

    info!(provider = provider.name(), "llm provider ready");
    Ok(provider)
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: lmchat [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Set logging verbosity (warn, info, debug, trace)");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            other => eprintln!("warning: ignoring unknown argument '{other}'"),
        }
    }

    //   -v     → warn
    //   -vv    → info
    //   -vvv   → debug (request flow, token usage)
    //   -vvvv+ → trace (full LLM payloads)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
