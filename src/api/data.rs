//! Service metadata and template JSON files.

use std::io::ErrorKind;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::{ApiError, AppState};
use crate::context::Context;
use crate::{Response, StatusCode};

pub async fn health() -> Response {
    Response::json(
        StatusCode::Ok,
        &json!({ "status": "healthy", "message": "PPTist AI Backend is running" }),
    )
}

/// Welcome document listing the available endpoints.
pub async fn index() -> Response {
    Response::json(
        StatusCode::Ok,
        &json!({
            "message": "Welcome to PPTist AI Backend",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "outline": "/tools/aippt_outline",
                "content": "/tools/aippt",
                "health": "/health",
                "data": "/data/{filename}.json",
            },
        }),
    )
}

/// Serves `<template_dir>/<name>.json` for `GET /data/<name>.json`.
pub async fn template_file(state: Arc<AppState>, ctx: Context) -> Response {
    let file = ctx.params().get("file").unwrap_or_default();
    match read_template(&state, file).await {
        Ok(value) => {
            info!(file, "template file served");
            Response::json(StatusCode::Ok, &value)
        }
        Err(e) => e.into_response(),
    }
}

async fn read_template(state: &AppState, file: &str) -> Result<Value, ApiError> {
    let not_found = || ApiError::NotFound(file.to_owned());

    // Only bare `<name>.json` file names resolve inside the template directory.
    let name = file.strip_suffix(".json").ok_or_else(not_found)?;
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        warn!(file, "rejected template file name");
        return Err(not_found());
    }

    let path = state.settings.template_dir.join(file);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "template file not found");
            return Err(not_found());
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read template file");
            return Err(ApiError::Internal);
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        error!(path = %path.display(), error = %e, "template file is not valid JSON");
        ApiError::InvalidJson(file.to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::api::testing::*;

    fn state_with_templates(dir: &std::path::Path) -> Arc<AppState> {
        let mut settings = settings();
        settings.template_dir = dir.to_path_buf();
        Arc::new(AppState::new(settings, prompts(), Arc::new(ScriptedProvider::default())))
    }

    async fn fetch(state: Arc<AppState>, path: &str) -> (StatusCode, Value) {
        let res = router(state).route(get(path)).await;
        let status = res.status();
        (status, serde_json::from_str(&body_text(res).await).unwrap())
    }

    #[tokio::test]
    async fn health_and_index() {
        let state = state(Arc::new(ScriptedProvider::default()));
        let (status, body) = fetch(Arc::clone(&state), "/health").await;
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body["status"], "healthy");

        let (_, body) = fetch(state, "/").await;
        assert_eq!(body["endpoints"]["content"], "/tools/aippt");
    }

    #[tokio::test]
    async fn serves_template_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("theme.json"), r#"{"slides": [1, 2]}"#).unwrap();

        let (status, body) = fetch(state_with_templates(dir.path()), "/data/theme.json").await;
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, json!({ "slides": [1, 2] }));
    }

    #[tokio::test]
    async fn missing_template_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = fetch(state_with_templates(dir.path()), "/data/nope.json").await;
        assert_eq!(status, StatusCode::NotFound);
        assert_eq!(body["detail"], "File nope.json not found");
    }

    #[tokio::test]
    async fn malformed_template_is_400() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ nope").unwrap();

        let (status, body) = fetch(state_with_templates(dir.path()), "/data/broken.json").await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(body["detail"], "File broken.json format error");
    }

    #[tokio::test]
    async fn non_json_and_traversal_names_are_404() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        let state = state_with_templates(dir.path());

        for path in ["/data/notes.txt", "/data/..json", "/data/.json"] {
            let (status, _) = fetch(Arc::clone(&state), path).await;
            assert_eq!(status, StatusCode::NotFound, "{path}");
        }
    }

    #[tokio::test]
    async fn unreadable_template_is_500() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("folder.json")).unwrap();

        let (status, body) = fetch(state_with_templates(dir.path()), "/data/folder.json").await;
        assert_eq!(status, StatusCode::InternalServerError);
        assert_eq!(body["detail"], "Internal server error");
    }
}
