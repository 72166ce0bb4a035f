//! Vertex (Node) abstractions for the Pregel runtime
//!
//! A Vertex is one computation unit in the workflow graph. The runtime runs
//! exactly one vertex per superstep, merges its update into the shared
//! state, then follows the graph edges (optionally selected by the branch
//! label the vertex returned).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::PregelError;
use super::state::WorkflowState;

/// Unique identifier for a vertex in the workflow graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub String);

impl VertexId {
    /// Create a new VertexId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for partial state updates produced by vertex computation
pub trait StateUpdate: Clone + Send + Sync + 'static {
    /// Create an empty (no-op) update
    fn empty() -> Self;

    /// Check if this update has no effect
    fn is_empty(&self) -> bool;
}

/// Result of a single vertex computation
///
/// `branch` selects among the vertex's conditional edges. Vertices with a
/// single direct edge leave it unset.
#[derive(Debug, Clone)]
pub struct StepOutput<U: StateUpdate> {
    pub update: U,
    pub branch: Option<String>,
}

impl<U: StateUpdate> StepOutput<U> {
    /// Output that follows the vertex's direct edge
    pub fn new(update: U) -> Self {
        Self {
            update,
            branch: None,
        }
    }

    /// Output that selects a conditional edge
    pub fn branch(update: U, branch: impl Into<String>) -> Self {
        Self {
            update,
            branch: Some(branch.into()),
        }
    }

    /// No-op output
    pub fn empty() -> Self {
        Self::new(U::empty())
    }
}

/// Core Vertex trait
///
/// `compute` reads the current state and returns a partial update. When it
/// fails, the runtime merges `fallback` instead and keeps routing, so a
/// vertex that can degrade gracefully should override it.
#[async_trait]
pub trait Vertex<S: WorkflowState>: Send + Sync {
    /// Get the vertex ID
    fn id(&self) -> &VertexId;

    /// Execute the vertex computation for one superstep
    async fn compute(&self, state: &S) -> Result<StepOutput<S::Update>, PregelError>;

    /// Output merged when `compute` fails
    fn fallback(&self, _state: &S, _error: &PregelError) -> StepOutput<S::Update> {
        StepOutput::empty()
    }
}

/// Type alias for a shared vertex
pub type BoxedVertex<S> = Arc<dyn Vertex<S>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pregel::state::{UnitState, UnitUpdate};

    struct EchoVertex {
        id: VertexId,
    }

    #[async_trait]
    impl Vertex<UnitState> for EchoVertex {
        fn id(&self) -> &VertexId {
            &self.id
        }

        async fn compute(&self, _state: &UnitState) -> Result<StepOutput<UnitUpdate>, PregelError> {
            Ok(StepOutput::branch(UnitUpdate, "next"))
        }
    }

    #[test]
    fn test_vertex_id_conversions() {
        let a = VertexId::from("plan");
        let b = VertexId::new(String::from("plan"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "plan");
        assert_eq!(a.to_string(), "plan");
    }

    #[test]
    fn test_step_output_constructors() {
        let out: StepOutput<UnitUpdate> = StepOutput::new(UnitUpdate);
        assert!(out.branch.is_none());

        let out: StepOutput<UnitUpdate> = StepOutput::branch(UnitUpdate, "end");
        assert_eq!(out.branch.as_deref(), Some("end"));
    }

    #[tokio::test]
    async fn test_vertex_compute_and_default_fallback() {
        let vertex: BoxedVertex<UnitState> = Arc::new(EchoVertex {
            id: VertexId::from("echo"),
        });

        let out = vertex.compute(&UnitState).await.unwrap();
        assert_eq!(out.branch.as_deref(), Some("next"));

        let err = PregelError::vertex_error("echo", "boom");
        let fallback = vertex.fallback(&UnitState, &err);
        assert!(fallback.branch.is_none());
        assert!(fallback.update.is_empty());
    }
}
