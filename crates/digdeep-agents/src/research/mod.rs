//! Research workflow
//!
//! A session moves through seven steps over a single typed
//! [`SessionState`]:
//!
//! ```text
//! clarify ─▶ write_brief ─▶ plan ─▶ gather ─▶ chart ─▶ evaluate ─▶ report
//!    │                                 ▲                  │
//!    └─▶ END (needs clarification)     └── insufficient ──┘
//! ```
//!
//! # Module Structure
//!
//! - `state` - Session state, partial updates and the records they carry
//! - `prompts` - Prompt templates for the model-backed steps
//! - `steps` - One vertex per workflow step
//! - `extract` - Chart data extraction from gathered snippets
//! - `report` - Report normalization, rendering and export
//! - `workflow` - Graph wiring and the [`ResearchAgent`] session driver

pub mod extract;
pub mod prompts;
pub mod report;
pub mod state;
pub mod steps;
pub mod workflow;

// Re-exports for convenience
pub use extract::{chart_points, DataOrigin};
pub use prompts::ResearchPrompts;
pub use report::ReportFormat;
pub use state::{
    CriterionScore, EvaluationResult, GatheredInformation, Graph, InformationItem, PlanStep,
    ReportSection, ResearchBrief, ResearchPlan, ResearchReport, SessionState, SessionUpdate,
    StepAction, VisualizationDirective,
};
pub use steps::{ScopeDecision, StepContext, Sufficiency};
pub use workflow::{build_research_graph, new_session_id, ResearchAgent, SessionOutcome};
