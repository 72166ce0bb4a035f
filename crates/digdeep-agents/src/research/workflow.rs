//! Research workflow graph and session driver
//!
//! # Workflow Structure
//!
//! ```text
//! ┌──────────┐ needs_clarification
//! │ clarify  │ ─────────────────────────────────────────▶ END
//! └────┬─────┘
//!      │ proceed
//!      ▼
//! ┌─────────────┐   ┌──────┐   ┌────────┐   ┌───────┐   ┌──────────┐
//! │ write_brief │ ▶ │ plan │ ▶ │ gather │ ▶ │ chart │ ▶ │ evaluate │
//! └─────────────┘   └──────┘   └────────┘   └───────┘   └────┬─────┘
//!                                   ▲                        │
//!                                   └──── insufficient ──────┤
//!                                                            │ sufficient
//!                                                            ▼
//!                                                       ┌────────┐
//!                                                       │ report │ ▶ END
//!                                                       └────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use digdeep_agents::research::{new_session_id, ResearchAgent, SessionOutcome};
//!
//! let agent = ResearchAgent::new(llm, search, charts, ResearchConfig::default())?;
//! let session = new_session_id();
//!
//! let mut outcome = agent.start(&session, "Best coffee shops").await?;
//! while let SessionOutcome::NeedsClarification { question, .. } = &outcome {
//!     let answer = ask_user(question);
//!     outcome = agent.reply(&session, &answer).await?;
//! }
//! ```

use std::sync::Arc;
use tracing::info;

use super::state::SessionState;
use super::steps::{
    BriefVertex, ChartVertex, ClarifyVertex, EvaluateVertex, GatherVertex, PlanVertex,
    ReportVertex, ScopeDecision, StepContext, Sufficiency, CHART, CLARIFY, EVALUATE, GATHER,
    PLAN, REPORT, WRITE_BRIEF,
};
use crate::config::ResearchConfig;
use crate::error::AgentError;
use crate::llm::LLMProvider;
use crate::pregel::{Checkpointer, MemoryCheckpointer, PregelRuntime, WorkflowResult};
use crate::state::Message;
use crate::tools::{ChartRenderer, WebSearch};
use crate::workflow::{BuiltWorkflowGraph, WorkflowBuildError, WorkflowGraph, END};

pub const WORKFLOW_NAME: &str = "research";

/// Wire the seven research steps into a graph
pub fn build_research_graph(
    ctx: Arc<StepContext>,
) -> Result<BuiltWorkflowGraph<SessionState>, WorkflowBuildError> {
    WorkflowGraph::new()
        .name(WORKFLOW_NAME)
        .node(CLARIFY, ClarifyVertex::new(ctx.clone()))
        .node(WRITE_BRIEF, BriefVertex::new(ctx.clone()))
        .node(PLAN, PlanVertex::new(ctx.clone()))
        .node(GATHER, GatherVertex::new(ctx.clone()))
        .node(CHART, ChartVertex::new(ctx.clone()))
        .node(EVALUATE, EvaluateVertex::new(ctx.clone()))
        .node(REPORT, ReportVertex::new(ctx))
        .entry(CLARIFY)
        .conditional_edges(
            CLARIFY,
            vec![
                (ScopeDecision::NeedsClarification.branch(), END),
                (ScopeDecision::Proceed.branch(), WRITE_BRIEF),
            ],
        )
        .edge(WRITE_BRIEF, PLAN)
        .edge(PLAN, GATHER)
        .edge(GATHER, CHART)
        .edge(CHART, EVALUATE)
        .conditional_edges(
            EVALUATE,
            vec![
                (Sufficiency::Sufficient.branch(), REPORT),
                (Sufficiency::Insufficient.branch(), GATHER),
            ],
        )
        .edge(REPORT, END)
        .build()
}

/// Fresh opaque session id
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Where a session stands after a run
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// Halted with a question for the user
    NeedsClarification {
        question: String,
        state: SessionState,
    },
    /// Ran through to a report
    Completed { state: SessionState },
}

impl SessionOutcome {
    pub fn state(&self) -> &SessionState {
        match self {
            SessionOutcome::NeedsClarification { state, .. } => state,
            SessionOutcome::Completed { state } => state,
        }
    }

    pub fn into_state(self) -> SessionState {
        match self {
            SessionOutcome::NeedsClarification { state, .. } => state,
            SessionOutcome::Completed { state } => state,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed { .. })
    }

    fn from_state(state: SessionState) -> Self {
        match (&state.clarification, state.is_complete()) {
            (Some(question), false) => SessionOutcome::NeedsClarification {
                question: question.clone(),
                state,
            },
            _ => SessionOutcome::Completed { state },
        }
    }
}

/// Runs research sessions and keeps their state between turns
pub struct ResearchAgent {
    runtime: PregelRuntime<SessionState>,
    checkpointer: Arc<dyn Checkpointer<SessionState>>,
    config: ResearchConfig,
}

impl ResearchAgent {
    /// Build the workflow around the given collaborators
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        search: Arc<dyn WebSearch>,
        charts: Arc<dyn ChartRenderer>,
        config: ResearchConfig,
    ) -> Result<Self, AgentError> {
        let checkpointer = Arc::new(MemoryCheckpointer::<SessionState>::new());
        Self::with_checkpointer(llm, search, charts, config, checkpointer)
    }

    /// Like [`ResearchAgent::new`] but storing sessions in `checkpointer`
    pub fn with_checkpointer(
        llm: Arc<dyn LLMProvider>,
        search: Arc<dyn WebSearch>,
        charts: Arc<dyn ChartRenderer>,
        config: ResearchConfig,
        checkpointer: Arc<dyn Checkpointer<SessionState>>,
    ) -> Result<Self, AgentError> {
        config.validate()?;

        let ctx = Arc::new(StepContext::new(llm, search, charts, config.clone()));
        let graph = build_research_graph(ctx)?;
        let runtime = PregelRuntime::with_config(Arc::new(graph), config.pregel_config())
            .with_checkpointer(checkpointer.clone());

        Ok(Self {
            runtime,
            checkpointer,
            config,
        })
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Begin a session from its opening message
    ///
    /// Any earlier history stored under `session_id` is discarded.
    pub async fn start(
        &self,
        session_id: &str,
        opening_message: &str,
    ) -> Result<SessionOutcome, AgentError> {
        self.checkpointer.clear(session_id).await?;

        let state = SessionState::new(opening_message, self.config.max_iterations);
        info!(session_id, "Starting research session");

        let result = self.runtime.run(session_id, state).await?;
        Ok(Self::outcome(result))
    }

    /// Answer a clarifying question and run the session again from `clarify`.
    ///
    /// Fails with [`AgentError::SessionCompleted`] unless the latest run of the
    /// session halted on a question.
    pub async fn reply(&self, session_id: &str, text: &str) -> Result<SessionOutcome, AgentError> {
        let latest = self
            .checkpointer
            .latest(session_id)
            .await?
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))?;

        // Only a run halted on a clarifying question can take a reply
        if latest.state.clarification.is_none() || latest.state.research_report.is_some() {
            return Err(AgentError::SessionCompleted(session_id.to_string()));
        }

        let mut state = latest.state;
        state.messages.push(Message::user(text));
        state.clarification = None;

        info!(session_id, resumed_after = latest.superstep, "Resuming research session");
        let result = self.runtime.resume(session_id, state, latest.superstep).await?;
        Ok(Self::outcome(result))
    }

    /// Latest saved state of a session
    pub async fn session(&self, session_id: &str) -> Result<Option<SessionState>, AgentError> {
        Ok(self
            .checkpointer
            .latest(session_id)
            .await?
            .map(|checkpoint| checkpoint.state))
    }

    fn outcome(result: WorkflowResult<SessionState>) -> SessionOutcome {
        info!(
            supersteps = result.supersteps,
            halted_at = %result.halted_at,
            path = ?result.path,
            "Research run finished"
        );
        SessionOutcome::from_state(result.state)
    }
}
