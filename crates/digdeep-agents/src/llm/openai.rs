//! OpenAI chat models through Rig's OpenAI client

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::openai::Client;
use tracing::debug;

use super::config::LLMConfig;
use super::provider::{prompt_text, system_preamble, LLMProvider, LLMResponse};
use crate::error::AgentError;
use crate::state::Message;

/// [`LLMProvider`] backed by the OpenAI API
///
/// ```rust,ignore
/// // Reads OPENAI_API_KEY
/// let provider = OpenAIProvider::from_env_with_model("gpt-4.1");
/// ```
pub struct OpenAIProvider {
    client: Client,
    default_config: LLMConfig,
}

impl OpenAIProvider {
    /// `OPENAI_API_KEY` with the default model
    pub fn from_env() -> Self {
        Self::from_env_with_model("gpt-4.1")
    }

    /// `OPENAI_API_KEY` with `model` as the default
    pub fn from_env_with_model(model: impl Into<String>) -> Self {
        Self {
            client: Client::from_env(),
            default_config: LLMConfig::new(model),
        }
    }

    /// Set defaults applied to every request
    pub fn with_default_config(mut self, config: LLMConfig) -> Self {
        self.default_config = config.or_defaults(&self.default_config);
        self
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, AgentError> {
        let config = config
            .map(|c| c.or_defaults(&self.default_config))
            .unwrap_or_else(|| self.default_config.clone());

        let mut builder = self.client.agent(&config.model);

        if let Some(preamble) = system_preamble(messages) {
            builder = builder.preamble(&preamble);
        }
        if let Some(temperature) = config.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(limit) = config.max_tokens {
            builder = builder.max_tokens(limit);
        }

        let prompt = prompt_text(messages);

        debug!(model = %config.model, prompt_len = prompt.len(), "OpenAI completion");

        let response = builder
            .build()
            .prompt(prompt.as_str())
            .await
            .map_err(|e| AgentError::Llm(format!("OpenAI completion failed: {}", e)))?;

        Ok(LLMResponse::new(Message::assistant(&response)))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_config.model
    }
}
