//! # deckstream
//!
//! A streaming LLM gateway for slide-deck generation, on a from-scratch async
//! HTTP/1.1 server.
//!
//! Clients post a topic or a markdown outline; the service renders a prompt
//! template, streams the completion from an OpenAI-compatible provider, and
//! forwards it either verbatim or re-segmented into one JSON page record per
//! blank-line-delimited block.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use deckstream::api::{self, AppState};
//! use deckstream::config::Settings;
//! use deckstream::llm::OpenAiProvider;
//! use deckstream::prompt::PromptSet;
//! use deckstream::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let prompts = PromptSet::load(&settings.prompt_dir)?;
//!     let server = Server::bind(settings.bind_addr()).await?;
//!
//!     let state = Arc::new(AppState::new(settings, prompts, Arc::new(OpenAiProvider::new()?)));
//!     let app = Arc::new(api::app(state));
//!     server
//!         .run(move |req| {
//!             let app = Arc::clone(&app);
//!             async move { app.handle(req).await }
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

// ── Transport ─────────────────────────────────────────────────────────────────
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;

// ── Generation ────────────────────────────────────────────────────────────────
pub mod api;
pub mod config;
pub mod llm;
pub mod outline;
pub mod prompt;
pub mod segment;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
