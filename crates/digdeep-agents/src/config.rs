//! Research configuration
//!
//! Tunables for one research session. The binary fills these from
//! environment variables and CLI flags; library users build them directly.
//!
//! # Example
//!
//! ```ignore
//! use digdeep_agents::config::{ChartMode, ResearchConfig};
//!
//! let config = ResearchConfig::new()
//!     .with_max_iterations(3)
//!     .with_chart_mode(ChartMode::Always);
//! config.validate()?;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AgentError;
use crate::llm::LLMConfig;
use crate::pregel::PregelConfig;

/// When the chart step renders an image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartMode {
    /// Render every cycle
    Always,
    /// Render only when the brief carries a visualization directive
    #[default]
    WhenRequested,
    /// Never render
    Never,
}

impl ChartMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartMode::Always => "always",
            ChartMode::WhenRequested => "when-requested",
            ChartMode::Never => "never",
        }
    }
}

impl fmt::Display for ChartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartMode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "always" => Ok(ChartMode::Always),
            "when-requested" | "requested" => Ok(ChartMode::WhenRequested),
            "never" | "off" => Ok(ChartMode::Never),
            other => Err(AgentError::Config(format!(
                "unknown chart mode '{}', expected always, when-requested or never",
                other
            ))),
        }
    }
}

/// How the evaluate step decides whether to keep gathering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationPolicy {
    /// Stop exactly when the iteration budget is spent
    #[default]
    IterationBudget,
    /// Ask the model below the budget; the budget still caps the loop
    ModelJudged,
}

impl FromStr for EvaluationPolicy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "iteration-budget" | "budget" => Ok(EvaluationPolicy::IterationBudget),
            "model-judged" | "model" => Ok(EvaluationPolicy::ModelJudged),
            other => Err(AgentError::Config(format!(
                "unknown evaluation policy '{}', expected iteration-budget or model-judged",
                other
            ))),
        }
    }
}

/// Settings for a research session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Gather/evaluate cycles before the report is forced
    pub max_iterations: u32,

    /// Results requested per search
    pub max_search_results: usize,

    pub chart_mode: ChartMode,

    /// Directory chart images are written to
    pub chart_output_dir: PathBuf,

    pub evaluation_policy: EvaluationPolicy,

    /// Runner ceiling; a workflow that exceeds it fails
    pub max_supersteps: usize,

    /// Sampling temperature for every model call
    pub temperature: f64,

    pub max_tokens: Option<u64>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            max_search_results: 5,
            chart_mode: ChartMode::default(),
            chart_output_dir: PathBuf::from("graphs"),
            evaluation_policy: EvaluationPolicy::default(),
            max_supersteps: 50,
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

impl ResearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = max;
        self
    }

    pub fn with_chart_mode(mut self, mode: ChartMode) -> Self {
        self.chart_mode = mode;
        self
    }

    pub fn with_chart_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chart_output_dir = dir.into();
        self
    }

    pub fn with_evaluation_policy(mut self, policy: EvaluationPolicy) -> Self {
        self.evaluation_policy = policy;
        self
    }

    pub fn with_max_supersteps(mut self, max: usize) -> Self {
        self.max_supersteps = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Reject settings the workflow cannot run with
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }
        if self.max_search_results == 0 {
            return Err(AgentError::Config("max_search_results must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AgentError::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        // clarify, brief, plan, then gather/chart/evaluate per cycle, then report
        let needed = 4 + 3 * self.max_iterations as usize;
        if self.max_supersteps < needed {
            return Err(AgentError::Config(format!(
                "max_supersteps {} cannot fit {} iterations (needs {})",
                self.max_supersteps, self.max_iterations, needed
            )));
        }
        Ok(())
    }

    /// Per-call model settings; the empty model name defers to the provider
    pub fn llm_config(&self) -> LLMConfig {
        let config = LLMConfig::default().with_temperature(self.temperature);
        match self.max_tokens {
            Some(max_tokens) => config.with_max_tokens(max_tokens),
            None => config,
        }
    }

    pub fn pregel_config(&self) -> PregelConfig {
        PregelConfig::default().with_max_supersteps(self.max_supersteps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_config_defaults() {
        let config = ResearchConfig::default();

        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.max_search_results, 5);
        assert_eq!(config.chart_mode, ChartMode::WhenRequested);
        assert_eq!(config.chart_output_dir, PathBuf::from("graphs"));
        assert_eq!(config.evaluation_policy, EvaluationPolicy::IterationBudget);
        assert_eq!(config.max_supersteps, 50);
        assert_eq!(config.temperature, 0.0);
        assert!(config.max_tokens.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_research_config_builder() {
        let config = ResearchConfig::new()
            .with_max_iterations(3)
            .with_max_search_results(8)
            .with_chart_mode(ChartMode::Never)
            .with_evaluation_policy(EvaluationPolicy::ModelJudged)
            .with_temperature(0.3)
            .with_max_tokens(2048);

        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.max_search_results, 8);
        assert_eq!(config.chart_mode, ChartMode::Never);
        assert_eq!(config.evaluation_policy, EvaluationPolicy::ModelJudged);
        assert_eq!(config.max_tokens, Some(2048));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ResearchConfig::new().with_max_iterations(0).validate().is_err());
        assert!(ResearchConfig::new().with_max_search_results(0).validate().is_err());
        assert!(ResearchConfig::new().with_temperature(3.5).validate().is_err());
        assert!(ResearchConfig::new()
            .with_max_iterations(20)
            .with_max_supersteps(30)
            .validate()
            .is_err());
    }

    #[test]
    fn test_chart_mode_parse() {
        assert_eq!("always".parse::<ChartMode>().unwrap(), ChartMode::Always);
        assert_eq!("when_requested".parse::<ChartMode>().unwrap(), ChartMode::WhenRequested);
        assert_eq!("Never".parse::<ChartMode>().unwrap(), ChartMode::Never);
        assert!("sometimes".parse::<ChartMode>().is_err());
        assert_eq!(ChartMode::WhenRequested.to_string(), "when-requested");
    }

    #[test]
    fn test_evaluation_policy_parse() {
        assert_eq!(
            "model-judged".parse::<EvaluationPolicy>().unwrap(),
            EvaluationPolicy::ModelJudged
        );
        assert!("vibes".parse::<EvaluationPolicy>().is_err());
    }

    #[test]
    fn test_llm_config_carries_settings() {
        let llm = ResearchConfig::new().with_max_tokens(512).llm_config();
        assert!(llm.model.is_empty());
        assert_eq!(llm.temperature, Some(0.0));
        assert_eq!(llm.max_tokens, Some(512));
    }
}
