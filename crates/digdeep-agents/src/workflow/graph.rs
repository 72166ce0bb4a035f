//! Graph builder for step workflows.
//!
//! Nodes, edges and the entry node are declared fluently; `build` checks that
//! every edge endpoint exists and that no node mixes routing styles.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use crate::pregel::{BoxedVertex, PregelError, Vertex, WorkflowState};

/// Edge target meaning "stop here".
pub const END: &str = "END";

/// One declared edge, before validation.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub branch: Option<String>,
}

/// Outgoing edges of a single node after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEdges {
    /// Always continue to this target
    Direct(String),
    /// Branch label to target, in declaration order
    Conditional(Vec<(String, String)>),
}

/// Why a graph failed to build.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowBuildError {
    #[error("no entry node declared")]
    NoEntryPoint,
    #[error("edge or entry refers to unregistered node {0}")]
    UnknownNode(String),
    #[error("node {0} mixes direct and conditional edges or has more than one direct edge")]
    ConflictingEdges(String),
}

/// Fluent graph declaration; call `build` to validate it.
pub struct WorkflowGraph<S: WorkflowState> {
    name: String,
    nodes: HashMap<String, BoxedVertex<S>>,
    edges: Vec<GraphEdge>,
    entry: Option<String>,
    _state: PhantomData<S>,
}

impl<S: WorkflowState> Default for WorkflowGraph<S> {
    fn default() -> Self {
        Self {
            name: String::new(),
            nodes: HashMap::new(),
            edges: Vec::new(),
            entry: None,
            _state: PhantomData,
        }
    }
}

impl<S: WorkflowState> WorkflowGraph<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, label: impl Into<String>) -> Self {
        self.name = label.into();
        self
    }

    /// Register a vertex under `id`.
    pub fn node(mut self, id: impl Into<String>, vertex: impl Vertex<S> + 'static) -> Self {
        self.nodes.insert(id.into(), Arc::new(vertex));
        self
    }

    /// Node the first superstep runs.
    pub fn entry(mut self, node: impl Into<String>) -> Self {
        self.entry = Some(node.into());
        self
    }

    /// Unconditional hop; `to` may be [`END`].
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let (from, to) = (from.into(), to.into());
        self.edges.push(GraphEdge {
            from,
            to,
            branch: None,
        });
        self
    }

    /// Branching hops out of `from`; the vertex picks one by label.
    pub fn conditional_edges(mut self, from: impl Into<String>, branches: Vec<(&str, &str)>) -> Self {
        let from = from.into();
        self.edges.extend(branches.into_iter().map(|(label, to)| GraphEdge {
            from: from.clone(),
            to: to.to_string(),
            branch: Some(label.to_string()),
        }));
        self
    }

    pub fn build(self) -> Result<BuiltWorkflowGraph<S>, WorkflowBuildError> {
        let entry_point = match self.entry {
            None => return Err(WorkflowBuildError::NoEntryPoint),
            Some(node) if !self.nodes.contains_key(&node) => {
                return Err(WorkflowBuildError::UnknownNode(node))
            }
            Some(node) => node,
        };
        let known = |id: &str| id == END || self.nodes.contains_key(id);

        let mut edges: HashMap<String, NodeEdges> = HashMap::new();
        for edge in self.edges {
            if edge.from == END || !known(&edge.from) {
                return Err(WorkflowBuildError::UnknownNode(edge.from));
            }
            if !known(&edge.to) {
                return Err(WorkflowBuildError::UnknownNode(edge.to));
            }

            match edge.branch {
                None => {
                    if edges.contains_key(&edge.from) {
                        return Err(WorkflowBuildError::ConflictingEdges(edge.from));
                    }
                    edges.insert(edge.from, NodeEdges::Direct(edge.to));
                }
                Some(label) => match edges.entry(edge.from) {
                    Entry::Vacant(slot) => {
                        slot.insert(NodeEdges::Conditional(vec![(label, edge.to)]));
                    }
                    Entry::Occupied(mut slot) => {
                        if let NodeEdges::Conditional(branches) = slot.get_mut() {
                            branches.push((label, edge.to));
                        } else {
                            return Err(WorkflowBuildError::ConflictingEdges(slot.key().clone()));
                        }
                    }
                },
            }
        }

        Ok(BuiltWorkflowGraph {
            nodes: self.nodes,
            edges,
            entry_point,
            name: self.name,
        })
    }
}

/// A validated graph the runtime walks.
pub struct BuiltWorkflowGraph<S: WorkflowState> {
    pub nodes: HashMap<String, BoxedVertex<S>>,
    pub edges: HashMap<String, NodeEdges>,
    pub entry_point: String,
    pub name: String,
}

impl<S: WorkflowState> BuiltWorkflowGraph<S> {
    /// Look up the vertex registered under `id`.
    pub fn vertex(&self, id: &str) -> Option<&BoxedVertex<S>> {
        self.nodes.get(id)
    }

    /// Resolve the node that follows `from`.
    ///
    /// Returns `Ok(None)` when the walk ends, either through an `END` edge or
    /// because `from` has no outgoing edges.
    pub fn next_node(&self, from: &str, branch: Option<&str>) -> Result<Option<&str>, PregelError> {
        let target = match self.edges.get(from) {
            None => return Ok(None),
            Some(NodeEdges::Direct(to)) => to.as_str(),
            Some(NodeEdges::Conditional(branches)) => {
                let branch = branch.ok_or_else(|| {
                    PregelError::routing_error(from, "no branch selected for conditional edges")
                })?;
                branches
                    .iter()
                    .find(|(condition, _)| condition == branch)
                    .map(|(_, to)| to.as_str())
                    .ok_or_else(|| {
                        PregelError::routing_error(from, format!("unknown branch '{}'", branch))
                    })?
            }
        };

        Ok((target != END).then_some(target))
    }
}

impl<S: WorkflowState> std::fmt::Debug for BuiltWorkflowGraph<S> {
    fn fmt(&self, out: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut nodes: Vec<&String> = self.nodes.keys().collect();
        nodes.sort();
        out.debug_struct("BuiltWorkflowGraph")
            .field("name", &self.name)
            .field("entry_point", &self.entry_point)
            .field("nodes", &nodes)
            .field("edges", &self.edges)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pregel::{StepOutput, UnitState, UnitUpdate, VertexId};
    use async_trait::async_trait;

    struct Passthrough(VertexId);

    fn passthrough(id: &str) -> Passthrough {
        Passthrough(VertexId::from(id))
    }

    #[async_trait]
    impl Vertex<UnitState> for Passthrough {
        fn id(&self) -> &VertexId {
            &self.0
        }

        async fn compute(&self, _state: &UnitState) -> Result<StepOutput<UnitUpdate>, PregelError> {
            Ok(StepOutput::empty())
        }
    }

    #[test]
    fn test_linear_graph() {
        let graph = WorkflowGraph::<UnitState>::new()
            .name("basic")
            .node("start", passthrough("start"))
            .node("next", passthrough("next"))
            .entry("start")
            .edge("start", "next")
            .build()
            .unwrap();

        assert_eq!(graph.name, "basic");
        assert_eq!(graph.entry_point, "start");
        assert!(graph.vertex("start").is_some());
        assert_eq!(
            graph.edges.get("start"),
            Some(&NodeEdges::Direct("next".to_string()))
        );
        assert_eq!(graph.next_node("start", None).unwrap(), Some("next"));
        assert_eq!(graph.next_node("next", None).unwrap(), None);
    }

    #[test]
    fn test_entry_required() {
        let outcome = WorkflowGraph::<UnitState>::new()
            .node("start", passthrough("start"))
            .build();

        assert_eq!(outcome.unwrap_err(), WorkflowBuildError::NoEntryPoint);
    }

    #[test]
    fn test_entry_must_be_registered() {
        let outcome = WorkflowGraph::<UnitState>::new()
            .node("start", passthrough("start"))
            .entry("elsewhere")
            .build();

        assert_eq!(
            outcome.unwrap_err(),
            WorkflowBuildError::UnknownNode("elsewhere".to_string())
        );
    }

    #[test]
    fn test_edge_to_unregistered_node() {
        let outcome = WorkflowGraph::<UnitState>::new()
            .node("start", passthrough("start"))
            .entry("start")
            .edge("start", "missing")
            .build();

        assert_eq!(
            outcome.unwrap_err(),
            WorkflowBuildError::UnknownNode("missing".to_string())
        );
    }

    #[test]
    fn test_mixed_routing_rejected() {
        let outcome = WorkflowGraph::<UnitState>::new()
            .node("start", passthrough("start"))
            .node("a", passthrough("a"))
            .entry("start")
            .edge("start", "a")
            .conditional_edges("start", vec![("done", END)])
            .build();

        assert_eq!(
            outcome.unwrap_err(),
            WorkflowBuildError::ConflictingEdges("start".to_string())
        );

        let outcome = WorkflowGraph::<UnitState>::new()
            .node("start", passthrough("start"))
            .node("a", passthrough("a"))
            .entry("start")
            .edge("start", "a")
            .edge("start", END)
            .build();

        assert!(matches!(
            outcome.unwrap_err(),
            WorkflowBuildError::ConflictingEdges(_)
        ));
    }

    #[test]
    fn test_branch_resolution() {
        let graph = WorkflowGraph::<UnitState>::new()
            .node("start", passthrough("start"))
            .node("a", passthrough("a"))
            .node("b", passthrough("b"))
            .entry("start")
            .conditional_edges("start", vec![("if_a", "a"), ("if_b", "b"), ("stop", END)])
            .build()
            .unwrap();

        assert_eq!(graph.next_node("start", Some("if_a")).unwrap(), Some("a"));
        assert_eq!(graph.next_node("start", Some("if_b")).unwrap(), Some("b"));
        assert_eq!(graph.next_node("start", Some("stop")).unwrap(), None);

        let err = graph.next_node("start", Some("if_c")).unwrap_err();
        assert!(err.to_string().contains("unknown branch 'if_c'"));
        assert!(graph.next_node("start", None).is_err());
    }

    #[test]
    fn test_edge_to_end() {
        let graph = WorkflowGraph::<UnitState>::new()
            .node("start", passthrough("start"))
            .entry("start")
            .edge("start", END)
            .build()
            .unwrap();

        assert_eq!(
            graph.edges.get("start"),
            Some(&NodeEdges::Direct(END.to_string()))
        );
        assert_eq!(graph.next_node("start", None).unwrap(), None);
    }
}
