//! digdeep-agents: research workflow state machine over Rig
//!
//! A research session scopes the user's request, writes a brief, plans
//! search queries, gathers results, optionally charts them, loops until the
//! information is judged sufficient, then synthesizes a report.
//!
//! - `pregel`: sequential superstep runtime with checkpointing
//! - `workflow`: graph builder (nodes, direct and conditional edges)
//! - `research`: the seven steps, their state and the session driver
//! - `llm`: `LLMProvider` trait with Rig-backed OpenAI and Ollama providers
//! - `tools`: web search backends, chart rendering and reflection notes
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use digdeep_agents::{ImageChartRenderer, OllamaProvider, ResearchAgent, ResearchConfig, TavilySearch};
//!
//! let config = ResearchConfig::default();
//! let agent = ResearchAgent::new(
//!     Arc::new(OllamaProvider::from_env_with_model("llama3.2")),
//!     Arc::new(TavilySearch::from_env()?),
//!     Arc::new(ImageChartRenderer::new(&config.chart_output_dir)),
//!     config,
//! )?;
//! let outcome = agent.start("session-1", "Best coffee shops in Nairobi").await?;
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod pregel;
pub mod research;
pub mod state;
pub mod tools;
pub mod workflow;

// Re-exports for convenience
pub use config::{ChartMode, EvaluationPolicy, ResearchConfig};
pub use error::AgentError;
pub use state::{Message, Role};

pub use tools::{
    ChartError, ChartKind, ChartRenderer, ChartRequest, DataPoint, DuckDuckGoSearch,
    ImageChartRenderer, ReflectionTool, SearchHit, SearchResponse, TavilyError, TavilySearch,
    WebSearch,
};

// Research workflow exports
pub use research::{
    new_session_id, ReportFormat, ResearchAgent, ResearchReport, SessionOutcome, SessionState,
};

// LLM Provider exports
pub use llm::{LLMConfig, LLMProvider, LLMResponse, OllamaProvider, OpenAIProvider};
