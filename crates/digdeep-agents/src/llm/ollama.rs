//! Ollama LLM Provider implementation via Rig
//!
//! Talks to a local Ollama server. Rig's client reads the server address
//! from `OLLAMA_API_BASE_URL` (default `http://localhost:11434`).

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::ollama;
use tracing::debug;

use super::config::LLMConfig;
use super::provider::{prompt_text, system_preamble, LLMProvider, LLMResponse};
use crate::error::AgentError;
use crate::state::Message;

/// Default Ollama server address
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Ollama LLM Provider
pub struct OllamaProvider {
    client: ollama::Client,
    host: String,
    default_config: LLMConfig,
}

impl OllamaProvider {
    /// Connect to the Ollama server at `host`
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        let host = host.into();
        std::env::set_var("OLLAMA_API_BASE_URL", &host);

        Self {
            client: ollama::Client::from_env(),
            host,
            default_config: LLMConfig::new(model),
        }
    }

    /// Connect using `OLLAMA_API_BASE_URL`, or the default local server
    pub fn from_env_with_model(model: impl Into<String>) -> Self {
        let host = std::env::var("OLLAMA_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
        Self::new(host, model)
    }

    /// Set defaults applied to every request
    pub fn with_default_config(mut self, config: LLMConfig) -> Self {
        self.default_config = config.or_defaults(&self.default_config);
        self
    }

    /// Server address this provider talks to
    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, AgentError> {
        let config = config
            .map(|c| c.or_defaults(&self.default_config))
            .unwrap_or_else(|| self.default_config.clone());

        let mut agent_builder = self.client.agent(&config.model);

        if let Some(preamble) = system_preamble(messages) {
            agent_builder = agent_builder.preamble(&preamble);
        }
        if let Some(temp) = config.temperature {
            agent_builder = agent_builder.temperature(temp);
        }
        if let Some(max_tokens) = config.max_tokens {
            agent_builder = agent_builder.max_tokens(max_tokens);
        }

        let agent = agent_builder.build();
        let prompt = prompt_text(messages);

        debug!(host = %self.host, model = %config.model, prompt_len = prompt.len(), "Ollama completion");

        let response = agent
            .prompt(prompt.as_str())
            .await
            .map_err(|e| AgentError::Llm(format!("Ollama completion failed: {}", e)))?;

        Ok(LLMResponse::new(Message::assistant(&response)))
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.default_config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_is_provider() {
        fn assert_provider<T: LLMProvider>() {}
        assert_provider::<OllamaProvider>();
    }

    #[tokio::test]
    #[ignore] // Requires a running Ollama server with llama3.2 pulled
    async fn test_ollama_provider_complete() {
        let provider = OllamaProvider::new(DEFAULT_OLLAMA_HOST, "llama3.2");
        let messages = vec![Message::user("Reply with the single word: ready")];

        let response = provider.complete(&messages, None).await.unwrap();

        assert!(!response.text().is_empty());
    }
}
