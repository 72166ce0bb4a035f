//! Workflow graph construction
//!
//! ```ignore
//! use digdeep_agents::workflow::{WorkflowGraph, END};
//!
//! let workflow = WorkflowGraph::<MyState>::new()
//!     .name("pipeline")
//!     .node("fetch", FetchVertex::new())
//!     .node("check", CheckVertex::new())
//!     .entry("fetch")
//!     .edge("fetch", "check")
//!     .conditional_edges("check", vec![("retry", "fetch"), ("done", END)])
//!     .build()?;
//! ```

pub mod graph;

pub use graph::{BuiltWorkflowGraph, GraphEdge, NodeEdges, WorkflowBuildError, WorkflowGraph, END};
