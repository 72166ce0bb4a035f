//! Checkpointing for the Pregel runtime
//!
//! A checkpoint captures the workflow state at a superstep boundary together
//! with the vertex that produced it. Checkpoints are grouped by workflow id,
//! which lets one checkpointer hold many independent sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::error::PregelError;
use super::state::WorkflowState;

/// Workflow state captured after a superstep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<S>
where
    S: WorkflowState,
{
    /// Identifier of the workflow instance (session)
    pub workflow_id: String,

    /// Number of supersteps completed when this checkpoint was taken
    pub superstep: usize,

    /// Vertex whose update produced this state
    pub vertex: String,

    /// The workflow state at this superstep
    pub state: S,

    /// When this checkpoint was created
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl<S> Checkpoint<S>
where
    S: WorkflowState,
{
    /// Create a new checkpoint
    pub fn new(
        workflow_id: impl Into<String>,
        superstep: usize,
        vertex: impl Into<String>,
        state: S,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            superstep,
            vertex: vertex.into(),
            state,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to this checkpoint
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Trait for checkpointing workflow state.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync
where
    S: WorkflowState,
{
    /// Save a checkpoint, replacing any earlier one at the same superstep.
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), PregelError>;

    /// Load a checkpoint by superstep number.
    async fn load(
        &self,
        workflow_id: &str,
        superstep: usize,
    ) -> Result<Option<Checkpoint<S>>, PregelError>;

    /// Load the latest checkpoint of a workflow.
    ///
    /// Returns `None` if the workflow has never been checkpointed.
    async fn latest(&self, workflow_id: &str) -> Result<Option<Checkpoint<S>>, PregelError>;

    /// List checkpoint superstep numbers of a workflow, sorted ascending.
    async fn list(&self, workflow_id: &str) -> Result<Vec<usize>, PregelError>;

    /// Delete a specific checkpoint.
    async fn delete(&self, workflow_id: &str, superstep: usize) -> Result<(), PregelError>;

    /// Keep only the most recent `keep` checkpoints of a workflow.
    async fn prune(&self, workflow_id: &str, keep: usize) -> Result<usize, PregelError> {
        let checkpoints = self.list(workflow_id).await?;
        let to_delete = checkpoints.len().saturating_sub(keep);
        let mut deleted = 0;

        for superstep in checkpoints.into_iter().take(to_delete) {
            self.delete(workflow_id, superstep).await?;
            deleted += 1;
        }

        Ok(deleted)
    }

    /// Clear all checkpoints of a workflow.
    async fn clear(&self, workflow_id: &str) -> Result<(), PregelError> {
        for superstep in self.list(workflow_id).await? {
            self.delete(workflow_id, superstep).await?;
        }
        Ok(())
    }
}

/// In-memory checkpointer keyed by workflow id.
///
/// Not durable: everything is lost when the process exits.
#[derive(Debug)]
pub struct MemoryCheckpointer<S>
where
    S: WorkflowState,
{
    checkpoints: tokio::sync::RwLock<HashMap<String, BTreeMap<usize, Checkpoint<S>>>>,
}

impl<S> Default for MemoryCheckpointer<S>
where
    S: WorkflowState,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MemoryCheckpointer<S>
where
    S: WorkflowState,
{
    /// Create a new in-memory checkpointer
    pub fn new() -> Self {
        Self {
            checkpoints: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    /// Ids of all workflows with at least one checkpoint
    pub async fn workflow_ids(&self) -> Vec<String> {
        let checkpoints = self.checkpoints.read().await;
        let mut ids: Vec<String> = checkpoints
            .iter()
            .filter(|(_, steps)| !steps.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemoryCheckpointer<S>
where
    S: WorkflowState,
{
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), PregelError> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints
            .entry(checkpoint.workflow_id.clone())
            .or_default()
            .insert(checkpoint.superstep, checkpoint.clone());
        Ok(())
    }

    async fn load(
        &self,
        workflow_id: &str,
        superstep: usize,
    ) -> Result<Option<Checkpoint<S>>, PregelError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints
            .get(workflow_id)
            .and_then(|steps| steps.get(&superstep))
            .cloned())
    }

    async fn latest(&self, workflow_id: &str) -> Result<Option<Checkpoint<S>>, PregelError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints
            .get(workflow_id)
            .and_then(|steps| steps.values().next_back())
            .cloned())
    }

    async fn list(&self, workflow_id: &str) -> Result<Vec<usize>, PregelError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints
            .get(workflow_id)
            .map(|steps| steps.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, workflow_id: &str, superstep: usize) -> Result<(), PregelError> {
        let mut checkpoints = self.checkpoints.write().await;
        if let Some(steps) = checkpoints.get_mut(workflow_id) {
            steps.remove(&superstep);
            if steps.is_empty() {
                checkpoints.remove(workflow_id);
            }
        }
        Ok(())
    }
}
