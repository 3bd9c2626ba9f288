//! LLM integration: streaming chat completions and prompt chains.
//!
//! - [`ChatProvider`] is the seam between the HTTP handlers and a model
//!   backend. It opens a [`FragmentStream`]: a finite, non-restartable
//!   sequence of text fragments in arrival order.
//! - [`OpenAiProvider`] talks to any OpenAI-compatible `/chat/completions`
//!   endpoint over server-sent events.
//! - [`PromptChain`] renders a prompt template and hands it to a provider.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::config::ModelConfig;
use crate::prompt::PromptError;

mod chain;
mod openai;

pub use chain::PromptChain;
pub use openai::OpenAiProvider;

/// Errors produced while talking to a model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode provider event: {0}")]
    Decode(String),

    #[error("provider reported an error mid-stream: {0}")]
    Stream(String),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}

/// A lazy, finite sequence of text fragments produced by one model call.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// A backend that can stream a chat completion for a single user prompt.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Starts a streaming completion of `prompt` with the given model settings.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be sent or the provider rejects it before
    /// streaming begins. Failures after that arrive as `Err` items on the stream.
    async fn stream_chat(
        &self,
        model: &ModelConfig,
        prompt: String,
    ) -> Result<FragmentStream, LlmError>;
}
