//! Generation endpoints: the raw outline stream and the paged deck stream.

use std::pin::pin;
use std::sync::Arc;

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};
use validator::Validate;

use super::{ApiError, AppState, parse_body};
use crate::context::Context;
use crate::llm::{LlmError, PromptChain};
use crate::outline::Outline;
use crate::prompt::Vars;
use crate::segment::{SEPARATOR, resegment};
use crate::{Response, StatusCode};

/// Written once every page of a deck has been streamed.
pub const END_RECORD: &str = r#"{"type": "end"}"#;

/// Longest accepted topic for outline generation, in characters.
pub const MAX_TOPIC_CHARS: u64 = 50;

fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}

fn default_stream() -> bool {
    true
}

/// Body of `POST /tools/aippt_outline`.
#[derive(Debug, Deserialize, Validate)]
pub struct OutlineRequest {
    #[serde(default = "default_model")]
    pub model: String,
    pub language: String,
    #[validate(length(max = MAX_TOPIC_CHARS, message = "content must be at most 50 characters"))]
    pub content: String,
    /// Accepted for compatibility; responses always stream.
    #[serde(default = "default_stream")]
    pub stream: bool,
}

/// Body of `POST /tools/aippt`. `content` is a markdown outline.
#[derive(Debug, Deserialize, Validate)]
pub struct ContentRequest {
    #[serde(default = "default_model")]
    pub model: String,
    pub language: String,
    pub content: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

// One chain invocation of the deck stream.
struct Phase {
    label: String,
    chain: PromptChain,
    vars: Vars,
}

fn event_stream(body: impl Stream<Item = Bytes> + Send + 'static) -> Response {
    Response::new(StatusCode::Ok)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .stream(body)
}

fn deck_chains(state: &AppState, model: &str) -> Result<(PromptChain, PromptChain), ApiError> {
    Ok((
        state.chain(&state.prompts.cover_contents, model)?,
        state.chain(&state.prompts.section_content, model)?,
    ))
}

fn error_record(err: &LlmError) -> Bytes {
    let record = json!({ "error": format!("generation failed: {err}") });
    Bytes::from(record.to_string())
}

/// Streams the model's outline for a topic exactly as it arrives.
///
/// An upstream failure after the response has started is reported in-band as
/// a final `Error: ...` line.
pub async fn outline(state: Arc<AppState>, ctx: Context) -> Response {
    let req: OutlineRequest = match parse_body(&ctx) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };
    info!(model = %req.model, language = %req.language, "outline generation requested");

    let chain = match state.chain(&state.prompts.outline, &req.model) {
        Ok(chain) => chain,
        Err(e) => {
            error!(error = %e, "failed to build outline chain");
            return e.into_response();
        }
    };
    let vars = Vars::from([("content", req.content), ("language", req.language)]);

    event_stream(stream! {
        info!("starting outline generation");
        let mut fragments = match chain.stream(&vars).await {
            Ok(fragments) => fragments,
            Err(e) => {
                error!(error = %e, "outline generation failed");
                yield Bytes::from(format!("Error: generation failed: {e}"));
                return;
            }
        };

        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => yield Bytes::from(text),
                Err(e) => {
                    error!(error = %e, "outline generation failed");
                    yield Bytes::from(format!("Error: generation failed: {e}"));
                    return;
                }
            }
        }
        info!("outline generation completed");
    })
}

/// Streams a deck for a markdown outline, one page record at a time.
///
/// The cover and contents pages come first, then the pages of each chapter in
/// outline order, then [`END_RECORD`]. Every page is followed by
/// [`SEPARATOR`]. If any phase fails, a single `{"error": ...}` record ends
/// the stream and no end record is written.
pub async fn pages(state: Arc<AppState>, ctx: Context) -> Response {
    let req: ContentRequest = match parse_body(&ctx) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };
    info!(
        model = %req.model,
        language = %req.language,
        outline_len = req.content.len(),
        "content generation requested"
    );

    let outline = Outline::parse(&req.content);
    info!(title = %outline.title, chapters = outline.chapters.len(), "outline parsed");

    let (cover, section) = match deck_chains(&state, &req.model) {
        Ok(chains) => chains,
        Err(e) => {
            error!(error = %e, "failed to build generation chains");
            return e.into_response();
        }
    };

    let mut phases = vec![Phase {
        label: "cover and contents".to_owned(),
        chain: cover,
        vars: Vars::from([
            ("language", req.language.clone()),
            ("content", req.content.clone()),
        ]),
    }];
    for chapter in &outline.chapters {
        phases.push(Phase {
            label: chapter.title.clone(),
            chain: section.clone(),
            vars: Vars::from([
                ("language", req.language.clone()),
                ("section_title", chapter.title.clone()),
                ("section_content", chapter.to_markdown()),
            ]),
        });
    }

    event_stream(stream! {
        let mut page_count = 0usize;

        for phase in phases {
            debug!(phase = %phase.label, "starting generation phase");
            let fragments = match phase.chain.stream(&phase.vars).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    error!(phase = %phase.label, error = %e, "content generation failed");
                    yield error_record(&e);
                    return;
                }
            };

            let mut records = pin!(resegment(fragments));
            while let Some(record) = records.next().await {
                match record {
                    Ok(page) => {
                        page_count += 1;
                        debug!(page = page_count, phase = %phase.label, "page generated");
                        yield Bytes::from(format!("{page}{SEPARATOR}"));
                    }
                    Err(e) => {
                        error!(phase = %phase.label, error = %e, "content generation failed");
                        yield error_record(&e);
                        return;
                    }
                }
            }
        }

        yield Bytes::from_static(END_RECORD.as_bytes());
        info!(pages = page_count, "content generation completed");
    })
}
