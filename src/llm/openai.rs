//! OpenAI-compatible streaming chat completions.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ChatProvider, FragmentStream, LlmError};
use crate::config::ModelConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    stream: bool,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// [`ChatProvider`] for OpenAI-compatible APIs (OpenAI, OpenRouter, vLLM, ...).
///
/// The endpoint, key and model come from the [`ModelConfig`] passed with
/// each call, so one provider instance serves every request.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Builds a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Transport`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn stream_chat(
        &self,
        model: &ModelConfig,
        prompt: String,
    ) -> Result<FragmentStream, LlmError> {
        let url = format!("{}/chat/completions", model.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &model.model,
            temperature: model.temperature,
            stream: true,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        debug!(url = %url, model = %model.model, prompt_len = prompt.len(), "opening completion stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&model.api_key)
            .header(ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_owned());
            warn!(status = status.as_u16(), error = %message, "provider rejected completion request");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Box::pin(decode_sse(response.bytes_stream())))
    }
}

/// Decodes an OpenAI chat-completion SSE byte stream into content fragments.
///
/// Ends at `data: [DONE]` or when the body ends. Empty deltas (role
/// announcements, finish markers) produce nothing. The first transport
/// error, undecodable event, or in-band `error` object is yielded once and
/// ends the stream.
pub(crate) fn decode_sse<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, LlmError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: fmt::Display + Send,
{
    async_stream::stream! {
        let mut events = Box::pin(bytes.eventsource());

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(LlmError::Transport(e.to_string()));
                    return;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                return;
            }

            match decode_chunk(data) {
                Ok(Some(fragment)) => {
                    yield Ok(fragment);
                }
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    }
}

fn decode_chunk(data: &str) -> Result<Option<String>, LlmError> {
    let chunk: ChatChunk =
        serde_json::from_str(data).map_err(|e| LlmError::Decode(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(LlmError::Stream(describe_error(&error)));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

// Pulls a human-readable message out of an error response body.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(json) => Some(match json.get("error") {
            Some(error) => describe_error(error),
            None => body.to_owned(),
        }),
        Err(_) => Some(body.to_owned()),
    }
}

fn describe_error(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), str::to_owned),
    }
}
