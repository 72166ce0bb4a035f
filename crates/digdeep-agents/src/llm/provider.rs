//! LLM Provider trait definition
//!
//! Defines the core abstraction for interacting with LLM providers.
//! Implementations bridge to specific providers (OpenAI, Ollama) via Rig.

use async_trait::async_trait;

use super::config::LLMConfig;
use crate::error::AgentError;
use crate::state::{render_conversation, Message, Role};

/// LLM completion response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// The assistant's response message
    pub message: Message,
}

impl LLMResponse {
    pub fn new(message: Message) -> Self {
        Self { message }
    }

    /// Response text
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// Core LLM Provider trait
///
/// Each call makes exactly one attempt; callers decide how to degrade when
/// it fails.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use digdeep_agents::llm::{LLMProvider, LLMResponse, LLMConfig};
///
/// struct MyProvider { /* ... */ }
///
/// #[async_trait]
/// impl LLMProvider for MyProvider {
///     async fn complete(
///         &self,
///         messages: &[Message],
///         config: Option<&LLMConfig>,
///     ) -> Result<LLMResponse, AgentError> {
///         // Implementation here
///     }
///
///     fn name(&self) -> &str { "my-provider" }
///     fn default_model(&self) -> &str { "my-model" }
/// }
/// ```
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion response
    ///
    /// # Arguments
    /// * `messages` - System instructions followed by the prompt turns
    /// * `config` - Optional runtime configuration overrides
    async fn complete(
        &self,
        messages: &[Message],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, AgentError>;

    /// Provider name for logging/debugging
    fn name(&self) -> &str;

    /// Default model identifier for this provider
    fn default_model(&self) -> &str;
}

/// Join all system messages into a single preamble
pub fn system_preamble(messages: &[Message]) -> Option<String> {
    let parts: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Prompt text sent to a single-turn Rig agent
///
/// A lone user turn is sent verbatim; longer exchanges are rendered as a
/// transcript so no turn is dropped.
pub fn prompt_text(messages: &[Message]) -> String {
    let turns: Vec<Message> = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned()
        .collect();

    match turns.as_slice() {
        [] => String::new(),
        [only] => only.content.clone(),
        _ => render_conversation(&turns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mock provider for testing
    struct MockProvider {
        response_prefix: String,
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        async fn complete(
            &self,
            messages: &[Message],
            config: Option<&LLMConfig>,
        ) -> Result<LLMResponse, AgentError> {
            let model = config.map(|c| c.model.as_str()).unwrap_or("mock-model-v1");
            let response = format!("{} ({}): {}", self.response_prefix, model, prompt_text(messages));
            Ok(LLMResponse::new(Message::assistant(&response)))
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn default_model(&self) -> &str {
            "mock-model-v1"
        }
    }

    #[tokio::test]
    async fn test_mock_provider_complete() {
        let provider = MockProvider {
            response_prefix: "Echo".to_string(),
        };
        let messages = vec![Message::system("be brief"), Message::user("Hello, world!")];

        let response = provider.complete(&messages, None).await.unwrap();

        assert_eq!(response.text(), "Echo (mock-model-v1): Hello, world!");
        assert_eq!(response.message.role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_mock_provider_with_config() {
        let provider = MockProvider {
            response_prefix: "Test".to_string(),
        };
        let config = LLMConfig::new("custom-model").with_temperature(0.0);

        let response = provider
            .complete(&[Message::user("Config test")], Some(&config))
            .await
            .unwrap();

        assert!(response.text().contains("custom-model"));
    }

    #[test]
    fn test_system_preamble() {
        let messages = vec![
            Message::system("one"),
            Message::user("q"),
            Message::system("two"),
        ];
        assert_eq!(system_preamble(&messages).as_deref(), Some("one\n\ntwo"));
        assert!(system_preamble(&[Message::user("q")]).is_none());
    }

    #[test]
    fn test_prompt_text() {
        assert_eq!(prompt_text(&[Message::user("only")]), "only");
        assert_eq!(
            prompt_text(&[Message::user("a"), Message::assistant("b")]),
            "user: a\nassistant: b"
        );
        assert!(prompt_text(&[]).is_empty());
    }
}
