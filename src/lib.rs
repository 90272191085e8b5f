//! lmchat — web chat front-end for a locally hosted language model.
//!
//! - **session** — per-conversation transcripts behind the [`session::SessionStore`] trait.
//! - **normalize** — strips channel markers from raw model output.
//! - **llm** — model providers (dummy, OpenAI-compatible).
//! - **chat** — one chat turn: append, complete, normalize, roll back on failure.
//! - **server** — axum router and server loop.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod normalize;
pub mod server;
pub mod session;
