//! Pregel-style runtime for graph-based workflows
//!
//! Key concepts:
//!
//! - **Vertex**: Computation unit (one research step)
//! - **Edge**: Connection between vertices (Direct, Conditional)
//! - **Superstep**: One vertex execution plus the merge of its update
//! - **Checkpoint**: State saved at a superstep boundary
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    PregelRuntime                          │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐                   │
//! │  │Superstep│→ │Superstep│→ │Superstep│→ ... → END         │
//! │  │    1    │  │    2    │  │    3    │                   │
//! │  └─────────┘  └─────────┘  └─────────┘                   │
//! │  Per superstep: Compute → Merge → Checkpoint → Route      │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod runtime;
pub mod state;
pub mod vertex;

// Re-exports
pub use checkpoint::{Checkpoint, Checkpointer, MemoryCheckpointer};
pub use config::PregelConfig;
pub use error::PregelError;
pub use runtime::{PregelRuntime, WorkflowResult};
pub use state::{UnitState, UnitUpdate, WorkflowState};
pub use vertex::{BoxedVertex, StateUpdate, StepOutput, Vertex, VertexId};
