//! Per-request generation settings

use serde::{Deserialize, Serialize};

/// Generation settings; providers hold a default and callers may override
/// any field for a single request.
///
/// # Example
///
/// ```
/// use digdeep_agents::llm::LLMConfig;
///
/// let config = LLMConfig::new("llama3.2")
///     .with_temperature(0.0)
///     .with_max_tokens(2048);
///
/// assert_eq!(config.model, "llama3.2");
/// assert_eq!(config.temperature, Some(0.0));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LLMConfig {
    /// e.g. "gpt-4.1", "llama3.2"
    pub model: String,
    pub temperature: Option<f64>,
    /// Completion length cap
    pub max_tokens: Option<u64>,
}

impl LLMConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, limit: u64) -> Self {
        self.max_tokens = Some(limit);
        self
    }

    /// Fill unset fields from `defaults`; the model falls back when empty
    pub fn or_defaults(&self, defaults: &LLMConfig) -> LLMConfig {
        LLMConfig {
            model: if self.model.is_empty() {
                defaults.model.clone()
            } else {
                self.model.clone()
            },
            temperature: self.temperature.or(defaults.temperature),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let config = LLMConfig::new("gpt-4.1")
            .with_temperature(0.7)
            .with_max_tokens(4096);

        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.max_tokens, Some(4096));
    }

    #[test]
    fn test_or_defaults() {
        let defaults = LLMConfig::new("llama3.2").with_max_tokens(1024);
        let runtime = LLMConfig::default().with_temperature(0.0);

        let merged = runtime.or_defaults(&defaults);
        assert_eq!(merged.model, "llama3.2");
        assert_eq!(merged.temperature, Some(0.0));
        assert_eq!(merged.max_tokens, Some(1024));
    }

    #[test]
    fn test_serializes_model_and_temperature() {
        let config = LLMConfig::new("gpt-4.1").with_temperature(0.5);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("gpt-4.1"));
        assert!(json.contains("0.5"));
    }
}
