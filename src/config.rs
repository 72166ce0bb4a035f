//! # Configuration Module
//!
//! Loads the CLI's settings from the environment (and a `.env` file when
//! present), validates them, and turns them into the library's
//! [`ResearchConfig`].

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use digdeep_agents::{ChartMode, ResearchConfig};

/// Default model per provider
const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Default Ollama server
const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

// =============================================================================
// PROVIDER SELECTION
// =============================================================================
/// Which language model backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => DEFAULT_OPENAI_MODEL,
            LlmProvider::Ollama => DEFAULT_OLLAMA_MODEL,
        }
    }
}

/// # Rust Concept: FromStr
///
/// Implementing `FromStr` lets both `str::parse()` and clap's `value_parser`
/// turn user text into the enum.
impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "ollama" => Ok(LlmProvider::Ollama),
            other => anyhow::bail!("Unknown LLM provider '{}'. Use 'openai' or 'ollama'.", other),
        }
    }
}

/// Which web search backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProvider {
    Tavily,
    DuckDuckGo,
}

impl FromStr for SearchProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tavily" => Ok(SearchProvider::Tavily),
            "duckduckgo" | "ddg" => Ok(SearchProvider::DuckDuckGo),
            other => anyhow::bail!(
                "Unknown search provider '{}'. Use 'tavily' or 'duckduckgo'.",
                other
            ),
        }
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Settings for one CLI invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: LlmProvider,

    /// Model name; `None` uses the provider's default
    pub model: Option<String>,

    /// Ollama server URL
    pub ollama_host: String,

    /// Sampling temperature (0.0 keeps scoping decisions deterministic)
    pub temperature: f64,

    /// Gather/evaluate cycles before the report is forced
    pub max_iterations: u32,

    pub max_search_results: usize,

    pub search_provider: SearchProvider,

    pub tavily_api_key: Option<String>,

    /// Whether OPENAI_API_KEY is present
    pub openai_key_present: bool,

    pub chart_mode: ChartMode,

    pub chart_output_dir: PathBuf,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let research = ResearchConfig::default();
        Self {
            provider: LlmProvider::Ollama,
            model: None,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            temperature: research.temperature,
            max_iterations: research.max_iterations,
            max_search_results: research.max_search_results,
            search_provider: SearchProvider::DuckDuckGo,
            tavily_api_key: None,
            openai_key_present: false,
            chart_mode: research.chart_mode,
            chart_output_dir: research.chart_output_dir,
            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if it exists.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    ///
    /// # Rust Concept: Closures as Parameters
    ///
    /// Taking `impl Fn(&str) -> Option<String>` lets tests pass a map
    /// instead of mutating the real process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(val) = lookup("LLM_PROVIDER") {
            config.provider = val.parse().context("LLM_PROVIDER must be 'openai' or 'ollama'")?;
        }

        if let Some(val) = lookup("MODEL").filter(|v| !v.trim().is_empty()) {
            config.model = Some(val);
        }

        if let Some(val) = lookup("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Some(val) = lookup("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.0)")?;
        }

        if let Some(val) = lookup("MAX_ITERATIONS") {
            config.max_iterations = val
                .parse()
                .context("MAX_ITERATIONS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("MAX_SEARCH_RESULTS") {
            config.max_search_results = val
                .parse()
                .context("MAX_SEARCH_RESULTS must be a valid positive integer")?;
        }

        config.tavily_api_key = lookup("TAVILY_API_KEY").filter(|k| !k.trim().is_empty());
        config.openai_key_present = lookup("OPENAI_API_KEY").is_some_and(|k| !k.trim().is_empty());

        // Tavily when a key is available, unless told otherwise
        config.search_provider = match lookup("SEARCH_PROVIDER") {
            Some(val) => val
                .parse()
                .context("SEARCH_PROVIDER must be 'tavily' or 'duckduckgo'")?,
            None if config.tavily_api_key.is_some() => SearchProvider::Tavily,
            None => SearchProvider::DuckDuckGo,
        };

        if let Some(val) = lookup("CHART_MODE") {
            config.chart_mode = val
                .parse()
                .context("CHART_MODE must be 'always', 'when-requested' or 'never'")?;
        }

        if let Some(val) = lookup("CHART_OUTPUT_DIR") {
            config.chart_output_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Model name sent to the provider
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Check values before any client is constructed.
    pub fn validate(&self) -> Result<()> {
        if self.provider == LlmProvider::OpenAi && !self.openai_key_present {
            anyhow::bail!("OPENAI_API_KEY must be set when LLM_PROVIDER is 'openai'");
        }

        if self.search_provider == SearchProvider::Tavily && self.tavily_api_key.is_none() {
            anyhow::bail!("TAVILY_API_KEY must be set when SEARCH_PROVIDER is 'tavily'");
        }

        self.research_config()
            .validate()
            .context("Invalid research settings")?;

        Ok(())
    }

    /// Library settings derived from this configuration.
    pub fn research_config(&self) -> ResearchConfig {
        // Each extra iteration costs three supersteps
        let supersteps = ResearchConfig::default()
            .max_supersteps
            .max(4 + 3 * self.max_iterations as usize);

        ResearchConfig::new()
            .with_max_iterations(self.max_iterations)
            .with_max_search_results(self.max_search_results)
            .with_chart_mode(self.chart_mode)
            .with_chart_output_dir(self.chart_output_dir.clone())
            .with_temperature(self.temperature)
            .with_max_supersteps(supersteps)
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.provider, LlmProvider::Ollama);
        assert_eq!(config.model(), "llama3.2");
        assert_eq!(config.ollama_host, "http://localhost:11434");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.max_search_results, 5);
        assert_eq!(config.chart_mode, ChartMode::WhenRequested);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = from_pairs(&[
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("MODEL", "gpt-4o-mini"),
            ("TEMPERATURE", "0.3"),
            ("MAX_ITERATIONS", "3"),
            ("MAX_SEARCH_RESULTS", "8"),
            ("CHART_MODE", "never"),
            ("CHART_OUTPUT_DIR", "out/charts"),
        ])
        .unwrap();

        assert_eq!(config.provider, LlmProvider::OpenAi);
        assert_eq!(config.model(), "gpt-4o-mini");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.max_search_results, 8);
        assert_eq!(config.chart_mode, ChartMode::Never);
        assert_eq!(config.chart_output_dir, PathBuf::from("out/charts"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_provider_follows_tavily_key() {
        let config = from_pairs(&[("TAVILY_API_KEY", "tvly-test")]).unwrap();
        assert_eq!(config.search_provider, SearchProvider::Tavily);

        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.search_provider, SearchProvider::DuckDuckGo);

        let config =
            from_pairs(&[("TAVILY_API_KEY", "tvly-test"), ("SEARCH_PROVIDER", "duckduckgo")])
                .unwrap();
        assert_eq!(config.search_provider, SearchProvider::DuckDuckGo);
    }

    #[test]
    fn test_parse_errors_name_the_variable() {
        let err = from_pairs(&[("TEMPERATURE", "warm")]).unwrap_err();
        assert!(err.to_string().contains("TEMPERATURE"));

        let err = from_pairs(&[("LLM_PROVIDER", "mystery")]).unwrap_err();
        assert!(err.to_string().contains("LLM_PROVIDER"));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_search_results = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.provider = LlmProvider::OpenAi;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search_provider = SearchProvider::Tavily;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_research_config_fits_many_iterations() {
        let mut config = Config::default();
        config.max_iterations = 30;

        let research = config.research_config();
        assert_eq!(research.max_supersteps, 94);
        assert!(research.validate().is_ok());
    }
}
