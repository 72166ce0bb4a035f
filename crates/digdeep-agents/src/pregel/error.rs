//! Failures raised while running a step graph

use super::vertex::VertexId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PregelError {
    /// The superstep ceiling was reached before the walk ended
    #[error("Max supersteps exceeded: {0}")]
    MaxSuperstepsExceeded(usize),

    /// A vertex failed; the runtime merges its fallback instead
    #[error("Vertex error in {vertex_id}: {message}")]
    VertexError {
        vertex_id: VertexId,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The selected branch has no edge
    #[error("Routing error in {vertex_id}: {decision}")]
    RoutingError { vertex_id: VertexId, decision: String },

    #[error("Checkpoint error: {0}")]
    CheckpointError(String),
}

impl PregelError {
    pub fn vertex_error(vertex_id: impl Into<VertexId>, message: impl Into<String>) -> Self {
        Self::VertexError {
            vertex_id: vertex_id.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Vertex failure that keeps the underlying error as `source()`
    pub fn vertex_error_with_source(
        vertex_id: impl Into<VertexId>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::VertexError {
            vertex_id: vertex_id.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn routing_error(vertex_id: impl Into<VertexId>, decision: impl Into<String>) -> Self {
        Self::RoutingError {
            vertex_id: vertex_id.into(),
            decision: decision.into(),
        }
    }

    pub fn checkpoint_error(message: impl Into<String>) -> Self {
        Self::CheckpointError(message.into())
    }

    /// True for failures a vertex fallback absorbs
    pub fn is_vertex_error(&self) -> bool {
        matches!(self, PregelError::VertexError { .. })
    }
}
