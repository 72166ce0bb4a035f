// src/error.rs
//! Error types for the research agent
//!
//! Collaborator failures are usually absorbed by the workflow steps and turned
//! into explanatory assistant turns; these types surface only where a caller
//! can do something about them.

use thiserror::Error;

use crate::pregel::PregelError;
use crate::tools::chart::ChartError;
use crate::workflow::WorkflowBuildError;

/// Top-level error for the research agent library
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workflow error: {0}")]
    Workflow(#[from] PregelError),

    #[error("Workflow build error: {0}")]
    Build(#[from] WorkflowBuildError),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session already completed: {0}")]
    SessionCompleted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    /// Whether the failure came from the model returning unusable text
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, AgentError::MalformedOutput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(AgentError: Send, Sync);

    #[test]
    fn test_error_display() {
        let err = AgentError::SessionNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Session not found: abc");

        let err = AgentError::SessionCompleted("abc".to_string());
        assert_eq!(err.to_string(), "Session already completed: abc");

        let err = AgentError::Llm("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_from_pregel_error() {
        let err: AgentError = PregelError::MaxSuperstepsExceeded(50).into();
        assert!(matches!(err, AgentError::Workflow(_)));
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn test_is_malformed_output() {
        assert!(AgentError::MalformedOutput("no json".into()).is_malformed_output());
        assert!(!AgentError::Search("down".into()).is_malformed_output());
    }
}
