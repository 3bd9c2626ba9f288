//! The HTTP surface: routes, shared state, and error responses.
//!
//! | Method | Path                    | Handler                         |
//! |--------|-------------------------|---------------------------------|
//! | POST   | `/tools/aippt_outline`  | [`generate::outline`]           |
//! | POST   | `/tools/aippt`          | [`generate::pages`]             |
//! | GET    | `/health`               | [`data::health`]                |
//! | GET    | `/data/:file`           | [`data::template_file`]         |
//! | GET    | `/`                     | [`data::index`]                 |

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

use crate::config::Settings;
use crate::context::Context;
use crate::llm::{ChatProvider, PromptChain};
use crate::middleware::{LoggerMiddleware, Pipeline};
use crate::prompt::{PromptSet, PromptTemplate};
use crate::security::CorsMiddleware;
use crate::{Response, Router, StatusCode};

pub mod data;
pub mod generate;

/// Origins allowed outside debug mode: the usual front-end dev servers.
pub const DEV_ORIGINS: [&str; 6] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
    "http://localhost:8080",
    "http://127.0.0.1:8080",
];

/// Immutable state shared by every request.
pub struct AppState {
    pub settings: Settings,
    pub prompts: PromptSet,
    pub provider: Arc<dyn ChatProvider>,
}

impl AppState {
    pub fn new(settings: Settings, prompts: PromptSet, provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            settings,
            prompts,
            provider,
        }
    }

    /// Builds a chain for `template` against the requested model.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotConfigured`] when no usable API key is configured.
    pub fn chain(&self, template: &PromptTemplate, model: &str) -> Result<PromptChain, ApiError> {
        if !self.settings.validate() {
            return Err(ApiError::NotConfigured);
        }
        Ok(PromptChain::new(
            template.clone(),
            Arc::clone(&self.provider),
            self.settings.model_config(Some(model)),
        ))
    }
}

/// Errors surfaced to clients before a response starts streaming.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request parameter validation failed")]
    Validation(Vec<Value>),

    #[error("OpenAI API Key not configured")]
    NotConfigured,

    #[error("File {0} not found")]
    NotFound(String),

    #[error("File {0} format error")]
    InvalidJson(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UnprocessableEntity,
            Self::NotFound(_) => StatusCode::NotFound,
            Self::InvalidJson(_) => StatusCode::BadRequest,
            Self::NotConfigured | Self::Internal => StatusCode::InternalServerError,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(detail) => json!({
                "detail": detail,
                "message": "Request parameter validation failed",
                "help": {
                    "/tools/aippt_outline": "Required parameters: model, language, content",
                    "/tools/aippt": "Required parameters: model, language, content",
                },
            }),
            other => json!({ "detail": other.to_string() }),
        };
        Response::json(status, &body)
    }
}

/// Deserializes and validates a JSON request body.
///
/// Failures become [`ApiError::Validation`] with one detail entry per problem.
pub fn parse_body<T>(ctx: &Context) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let request = ctx.request();
    let parsed: T = ctx.json().map_err(|e| {
        warn!(
            method = %request.method(),
            path = %request.path(),
            error = %e,
            body = %String::from_utf8_lossy(request.body()),
            "request validation failed"
        );
        ApiError::Validation(vec![json!({
            "type": "json_invalid",
            "loc": ["body"],
            "msg": e.to_string(),
        })])
    })?;

    parsed.validate().map_err(|errors| {
        warn!(path = %request.path(), error = %errors, "request validation failed");
        ApiError::Validation(validation_detail(&errors))
    })?;
    Ok(parsed)
}

fn validation_detail(errors: &ValidationErrors) -> Vec<Value> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                json!({
                    "type": err.code,
                    "loc": ["body", field],
                    "msg": err.message.clone().unwrap_or_else(|| err.code.clone()),
                })
            })
        })
        .collect()
}

/// The CORS policy for `settings`: any origin in debug mode, the dev
/// origins otherwise.
pub fn cors_policy(settings: &Settings) -> CorsMiddleware {
    let cors = CorsMiddleware::new().allow_credentials(true);
    if settings.debug {
        info!("CORS: debug mode, allowing all origins");
        cors.allow_origins(["*"])
    } else {
        info!(origins = ?DEV_ORIGINS, "CORS: allowing configured origins");
        cors.allow_origins(DEV_ORIGINS)
    }
}

/// Registers every route against `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    let s = Arc::clone(&state);
    router.post("/tools/aippt_outline", move |ctx| generate::outline(Arc::clone(&s), ctx));
    let s = Arc::clone(&state);
    router.post("/tools/aippt", move |ctx| generate::pages(Arc::clone(&s), ctx));
    router.get("/health", |_ctx| data::health());
    let s = Arc::clone(&state);
    router.get("/data/:file", move |ctx| data::template_file(Arc::clone(&s), ctx));
    router.get("/", |_ctx| data::index());

    router
}

/// The full application: request logging, CORS, then routing.
pub fn app(state: Arc<AppState>) -> Pipeline {
    let cors = cors_policy(&state.settings);
    Pipeline::new(router(state))
        .with(LoggerMiddleware)
        .with(cors)
        .build()
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::Method;

    #[tokio::test]
    async fn unconfigured_key_is_500_before_streaming() {
        let provider = Arc::new(ScriptedProvider::default());
        let mut settings = settings();
        settings.openai_api_key = None;
        let state = Arc::new(AppState::new(settings, prompts(), provider.clone()));

        let res = router(state)
            .route(post("/tools/aippt_outline", r#"{"language":"English","content":"tides"}"#))
            .await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
        assert!(!res.is_streaming());
        assert_eq!(
            body_text(res).await,
            r#"{"detail":"OpenAI API Key not configured"}"#
        );
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_422_with_help() {
        let state = state(Arc::new(ScriptedProvider::default()));
        let res = router(state).route(post("/tools/aippt", "{not json")).await;
        assert_eq!(res.status(), StatusCode::UnprocessableEntity);

        let body: Value = serde_json::from_str(&body_text(res).await).unwrap();
        assert_eq!(body["message"], "Request parameter validation failed");
        assert_eq!(body["detail"][0]["type"], "json_invalid");
        assert!(body["help"]["/tools/aippt"].is_string());
    }

    #[tokio::test]
    async fn app_applies_cors_for_dev_origins() {
        let state = state(Arc::new(ScriptedProvider::default()));
        let app = app(state);
        let raw = "OPTIONS /tools/aippt HTTP/1.1\r\nOrigin: http://localhost:5173\r\n\r\n";
        let req = crate::Request::parse(raw.as_bytes()).unwrap().0;
        assert_eq!(req.method(), &Method::Options);

        let res = app.handle(req).await;
        assert_eq!(res.status(), StatusCode::NoContent);
        assert_eq!(
            res.headers().get("access-control-allow-origin"),
            Some("http://localhost:5173")
        );
    }
}
