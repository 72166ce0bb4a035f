//! Pregel Runtime - execution engine for workflow graphs
//!
//! The runtime walks a built graph one vertex per superstep:
//! Compute → Merge → Checkpoint → Route. A failing vertex does not abort the
//! walk; its fallback output is merged in place of the lost update.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::checkpoint::{Checkpoint, Checkpointer};
use super::config::PregelConfig;
use super::error::PregelError;
use super::state::WorkflowState;
use crate::workflow::BuiltWorkflowGraph;

/// Result of a workflow execution
#[derive(Debug, Clone)]
pub struct WorkflowResult<S: WorkflowState> {
    /// Final workflow state
    pub state: S,
    /// Number of supersteps executed in this run
    pub supersteps: usize,
    /// Vertices executed, in order
    pub path: Vec<String>,
    /// Last vertex executed before the walk ended
    pub halted_at: String,
}

/// Pregel Runtime for executing workflow graphs
pub struct PregelRuntime<S: WorkflowState> {
    graph: Arc<BuiltWorkflowGraph<S>>,
    config: PregelConfig,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
}

impl<S: WorkflowState> PregelRuntime<S> {
    /// Create a new runtime with default configuration
    pub fn new(graph: Arc<BuiltWorkflowGraph<S>>) -> Self {
        Self::with_config(graph, PregelConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(graph: Arc<BuiltWorkflowGraph<S>>, config: PregelConfig) -> Self {
        Self {
            graph,
            config,
            checkpointer: None,
        }
    }

    /// Save state after supersteps through `checkpointer`
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer<S>>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &PregelConfig {
        &self.config
    }

    /// Get the graph being executed
    pub fn graph(&self) -> &BuiltWorkflowGraph<S> {
        &self.graph
    }

    /// Run the workflow from its entry point
    pub async fn run(
        &self,
        workflow_id: &str,
        initial_state: S,
    ) -> Result<WorkflowResult<S>, PregelError> {
        self.resume(workflow_id, initial_state, 0).await
    }

    /// Run the workflow from its entry point, numbering checkpoints after
    /// `completed_supersteps` so an earlier run's history is kept.
    pub async fn resume(
        &self,
        workflow_id: &str,
        initial_state: S,
        completed_supersteps: usize,
    ) -> Result<WorkflowResult<S>, PregelError> {
        let mut state = initial_state;
        let mut current = self.graph.entry_point.clone();
        let mut path = Vec::new();
        let mut superstep = 0;

        info!(
            workflow = %self.graph.name,
            workflow_id,
            entry = %current,
            "Starting workflow run"
        );

        loop {
            // Check max supersteps limit
            if superstep >= self.config.max_supersteps {
                return Err(PregelError::MaxSuperstepsExceeded(self.config.max_supersteps));
            }

            let vertex = self.graph.vertex(&current).ok_or_else(|| {
                PregelError::routing_error(current.as_str(), "vertex is not registered")
            })?;

            debug!(superstep, node = %current, "Executing vertex");
            let output = match vertex.compute(&state).await {
                Ok(output) => output,
                Err(e) => {
                    warn!(node = %current, error = %e, "Vertex failed, merging fallback output");
                    vertex.fallback(&state, &e)
                }
            };

            state = state.apply_update(output.update);
            path.push(current.clone());
            superstep += 1;

            self.checkpoint(workflow_id, completed_supersteps + superstep, &current, &state)
                .await?;

            if state.is_terminal() {
                debug!(node = %current, "State is terminal");
                break;
            }

            match self.graph.next_node(&current, output.branch.as_deref())? {
                Some(next) => {
                    debug!(from = %current, to = next, branch = ?output.branch, "Routing");
                    current = next.to_string();
                }
                None => break,
            }
        }

        info!(workflow_id, supersteps = superstep, halted_at = %current, "Workflow run finished");

        Ok(WorkflowResult {
            state,
            supersteps: superstep,
            path,
            halted_at: current,
        })
    }

    async fn checkpoint(
        &self,
        workflow_id: &str,
        superstep: usize,
        vertex: &str,
        state: &S,
    ) -> Result<(), PregelError> {
        let Some(checkpointer) = &self.checkpointer else {
            return Ok(());
        };
        if !self.config.should_checkpoint(superstep) {
            return Ok(());
        }

        let checkpoint = Checkpoint::new(workflow_id, superstep, vertex, state.clone());
        checkpointer.save(&checkpoint).await
    }
}
