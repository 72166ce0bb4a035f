//! # Agent Module
//!
//! Builds the library's [`ResearchAgent`] from CLI configuration: picks the
//! language model provider, the search backend and the chart renderer.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use digdeep_agents::{
    DuckDuckGoSearch, ImageChartRenderer, LLMConfig, LLMProvider, OllamaProvider, OpenAIProvider,
    ResearchAgent, TavilySearch, WebSearch,
};

use crate::config::{Config, LlmProvider, SearchProvider};

// =============================================================================
// COLLABORATORS
// =============================================================================
/// Language model client for the configured provider.
///
/// # Rust Concept: Trait Objects
///
/// Both providers implement `LLMProvider`, so either fits in an
/// `Arc<dyn LLMProvider>` and the workflow never knows which one it has.
pub fn build_llm(config: &Config) -> Arc<dyn LLMProvider> {
    let defaults = LLMConfig::new(config.model()).with_temperature(config.temperature);

    match config.provider {
        LlmProvider::OpenAi => Arc::new(
            OpenAIProvider::from_env_with_model(config.model()).with_default_config(defaults),
        ),
        LlmProvider::Ollama => Arc::new(
            OllamaProvider::new(&config.ollama_host, config.model()).with_default_config(defaults),
        ),
    }
}

/// Web search backend for the configured provider.
pub fn build_search(config: &Config) -> Result<Arc<dyn WebSearch>> {
    match config.search_provider {
        SearchProvider::Tavily => {
            let key = config
                .tavily_api_key
                .as_deref()
                .context("TAVILY_API_KEY is required for Tavily search")?;
            Ok(Arc::new(TavilySearch::new(key)))
        }
        SearchProvider::DuckDuckGo => Ok(Arc::new(DuckDuckGoSearch::new())),
    }
}

/// The research agent, ready to start sessions.
pub fn build_agent(config: &Config) -> Result<ResearchAgent> {
    let research = config.research_config();
    let charts = Arc::new(ImageChartRenderer::new(research.chart_output_dir.clone()));
    let search = build_search(config)?;
    let llm = build_llm(config);

    info!(
        provider = llm.name(),
        model = llm.default_model(),
        search = search.name(),
        chart_dir = %research.chart_output_dir.display(),
        "Research agent configured"
    );

    ResearchAgent::new(llm, search, charts, research).context("Failed to build research workflow")
}
