//! Axum HTTP server — JSON API under `/api/` plus the bundled chat page.
//!
//! ## URL layout
//!
//! ```text
//! POST /api/chat                    {message, session_id?} → {response, session_id}
//! GET  /api/history/{session_id}    → {history: [...]}
//! POST /api/clear/{session_id}      → {message}
//! GET  /api/health                  → {status, provider, store, sessions}
//! GET  /favicon.ico                 → 204
//! GET  /                            → chat page        (feature "ui")
//! GET  /static/script.js            → chat page script (feature "ui")
//! ```
//!
//! [`serve`] drives the axum event loop until the [`CancellationToken`]
//! fires, then shuts down gracefully.

mod api;
#[cfg(feature = "ui")]
mod ui;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::chat::ChatService;
use crate::error::AppError;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — everything inside is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self { chat }
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Bind `bind_addr` and serve until `shutdown` is cancelled.
pub async fn serve(
    bind_addr: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::Server(format!("cannot read local address: {e}")))?;
    info!(%local_addr, "http server listening");

    serve_listener(listener, state, shutdown).await?;

    info!("http server shut down");
    Ok(())
}

/// Serve on an already-bound listener. Tests bind port 0 and read the address first.
pub async fn serve_listener(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("axum server error: {e}")))
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/chat",                   post(api::chat))
        .route("/api/history/{session_id}",   get(api::history))
        .route("/api/clear/{session_id}",     post(api::clear))
        .route("/api/health",                 get(api::health))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }));

    #[cfg(feature = "ui")]
    let router = router
        .route("/",                 get(ui::root))
        .route("/static/script.js", get(ui::script));

    router.layer(cors).with_state(state)
}
