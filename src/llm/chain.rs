use std::sync::Arc;

use tracing::debug;

use super::{ChatProvider, FragmentStream, LlmError};
use crate::config::ModelConfig;
use crate::prompt::{PromptTemplate, Vars};

/// Prompt template → model → plain text fragments.
#[derive(Clone)]
pub struct PromptChain {
    template: PromptTemplate,
    provider: Arc<dyn ChatProvider>,
    model: ModelConfig,
}

impl PromptChain {
    pub fn new(template: PromptTemplate, provider: Arc<dyn ChatProvider>, model: ModelConfig) -> Self {
        Self {
            template,
            provider,
            model,
        }
    }

    /// Renders the template with `vars` and opens the provider stream.
    ///
    /// # Errors
    ///
    /// [`LlmError::Prompt`] if a template variable is missing, otherwise
    /// whatever the provider returns when opening the stream.
    pub async fn stream(&self, vars: &Vars) -> Result<FragmentStream, LlmError> {
        let prompt = self.template.render(vars)?;
        debug!(model = %self.model.model, prompt_len = prompt.len(), "invoking prompt chain");
        self.provider.stream_chat(&self.model, prompt).await
    }
}
