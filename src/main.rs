use std::process::ExitCode;
use std::sync::Arc;

use deckstream::api::{self, AppState};
use deckstream::config::Settings;
use deckstream::llm::OpenAiProvider;
use deckstream::prompt::PromptSet;
use deckstream::server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(problem) = settings.key_problem() {
        error!(reason = problem.describe(), "startup failed: API key not configured or invalid");
        error!("set OPENAI_API_KEY in the environment");
        return ExitCode::FAILURE;
    }

    let prompts = match PromptSet::load(&settings.prompt_dir) {
        Ok(prompts) => prompts,
        Err(e) => {
            error!(dir = %settings.prompt_dir.display(), "failed to load prompt templates: {e}");
            return ExitCode::FAILURE;
        }
    };
    let provider = match OpenAiProvider::new() {
        Ok(provider) => provider,
        Err(e) => {
            error!("failed to build provider client: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        base_url = %settings.openai_base_url,
        default_model = %settings.default_model,
        debug = settings.debug,
        "configuration loaded"
    );

    let server = match Server::bind(settings.bind_addr()).await {
        Ok(server) => server,
        Err(e) => {
            error!("startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let state = Arc::new(AppState::new(settings, prompts, Arc::new(provider)));
    let app = Arc::new(api::app(state));
    let handler = move |req| {
        let app = Arc::clone(&app);
        async move { app.handle(req).await }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    match server.run_until(handler, shutdown).await {
        Ok(()) => {
            info!("server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}
