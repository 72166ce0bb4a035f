//! Research workflow vertices
//!
//! One vertex per step: clarify, write_brief, plan, gather, chart,
//! evaluate, report. Each makes at most one kind of external call and
//! always appends at least one assistant turn. Model failures surface as
//! vertex errors; every vertex overrides `fallback` so the runtime can
//! merge a degraded update and keep going.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::extract::{chart_points, points_from_json};
use super::prompts::ResearchPrompts;
use super::state::{
    CriterionScore, EvaluationResult, GatheredInformation, Graph, InformationItem, PlanStep,
    ResearchBrief, ResearchPlan, ResearchReport, SessionState, SessionUpdate,
    VisualizationDirective,
};
use crate::config::{ChartMode, EvaluationPolicy, ResearchConfig};
use crate::error::AgentError;
use crate::llm::{complete_structured, LLMConfig, LLMProvider};
use crate::pregel::{PregelError, StepOutput, Vertex, VertexId};
use crate::state::{render_conversation, Message};
use crate::tools::{ChartKind, ChartRenderer, ChartRequest, ReflectionTool, WebSearch};

pub const CLARIFY: &str = "clarify";
pub const WRITE_BRIEF: &str = "write_brief";
pub const PLAN: &str = "plan";
pub const GATHER: &str = "gather";
pub const CHART: &str = "chart";
pub const EVALUATE: &str = "evaluate";
pub const REPORT: &str = "report";

/// Briefs shorter than this are replaced by the user's own words
const MIN_BRIEF_CHARS: usize = 20;

const DEFAULT_VERIFICATION: &str =
    "I have enough details to start the research.";

const CHART_TITLE: &str = "Research Data";

/// Outcome of the clarify step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDecision {
    Proceed,
    NeedsClarification,
}

impl ScopeDecision {
    pub fn branch(&self) -> &'static str {
        match self {
            ScopeDecision::Proceed => "proceed",
            ScopeDecision::NeedsClarification => "needs_clarification",
        }
    }
}

/// Outcome of the evaluate step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sufficiency {
    Sufficient,
    Insufficient,
}

impl Sufficiency {
    pub fn branch(&self) -> &'static str {
        match self {
            Sufficiency::Sufficient => "sufficient",
            Sufficiency::Insufficient => "insufficient",
        }
    }
}

/// Model answer for the clarify step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClarifyWithUser {
    #[serde(default)]
    pub need_clarification: bool,
    #[serde(default)]
    pub has_location: bool,
    #[serde(default)]
    pub needs_visualization: bool,
    #[serde(default)]
    pub graph_type: Option<String>,
    #[serde(default)]
    pub x_axis: Option<String>,
    #[serde(default)]
    pub y_axis: Option<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub verification: String,
}

impl ClarifyWithUser {
    /// Chart request implied by the answer, if any
    pub fn directive(&self) -> Option<VisualizationDirective> {
        let kind = meaningful(&self.graph_type);
        if !self.needs_visualization && kind.is_none() {
            return None;
        }
        let defaults = VisualizationDirective::default();
        Some(VisualizationDirective {
            chart_kind: kind.unwrap_or(defaults.chart_kind),
            x_label: meaningful(&self.x_axis).unwrap_or(defaults.x_label),
            y_label: meaningful(&self.y_axis).unwrap_or(defaults.y_label),
            data: Vec::new(),
        })
    }
}

/// Model answer for the write_brief step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResearchQuestion {
    #[serde(default)]
    pub research_brief: String,
    #[serde(default)]
    pub graph_type: Option<String>,
    #[serde(default)]
    pub x_axis: Option<String>,
    #[serde(default)]
    pub y_axis: Option<String>,
    #[serde(default)]
    pub graph_data: Option<Value>,
}

/// Model answer for the plan step
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlanOutput {
    Structured { steps: Vec<PlanStep> },
    Steps(Vec<PlanStep>),
    Queries(Vec<String>),
}

impl PlanOutput {
    pub fn into_plan(self) -> ResearchPlan {
        let steps: Vec<PlanStep> = match self {
            PlanOutput::Structured { steps } | PlanOutput::Steps(steps) => steps,
            PlanOutput::Queries(queries) => queries.into_iter().map(PlanStep::search).collect(),
        };
        ResearchPlan::new(
            steps
                .into_iter()
                .filter(|s| !s.description.trim().is_empty())
                .collect(),
        )
    }
}

/// Model answer for the evaluate step under [`EvaluationPolicy::ModelJudged`]
#[derive(Debug, Clone, Deserialize)]
pub struct SufficiencyJudgment {
    pub sufficient: bool,
    #[serde(default)]
    pub criteria: Vec<CriterionScore>,
    #[serde(default)]
    pub follow_up_queries: Vec<String>,
}

/// Collaborators shared by every vertex of one workflow
pub struct StepContext {
    llm: Arc<dyn LLMProvider>,
    search: Arc<dyn WebSearch>,
    charts: Arc<dyn ChartRenderer>,
    config: ResearchConfig,
    llm_config: LLMConfig,
    reflection: ReflectionTool,
}

impl StepContext {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        search: Arc<dyn WebSearch>,
        charts: Arc<dyn ChartRenderer>,
        config: ResearchConfig,
    ) -> Self {
        let llm_config = config.llm_config();
        Self {
            llm,
            search,
            charts,
            config,
            llm_config,
            reflection: ReflectionTool,
        }
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// One structured model call with a single user prompt
    async fn ask<T: DeserializeOwned>(&self, prompt: String) -> Result<T, AgentError> {
        let messages = [Message::user(&prompt)];
        complete_structured(self.llm.as_ref(), &messages, Some(&self.llm_config)).await
    }
}

fn step_error(step: &str, error: AgentError) -> PregelError {
    let message = error.to_string();
    PregelError::vertex_error_with_source(step, message, error)
}

fn failure_reason(error: &PregelError) -> String {
    match error {
        PregelError::VertexError { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Trimmed value unless empty or a spelled-out null
fn meaningful(value: &Option<String>) -> Option<String> {
    let v = value.as_deref()?.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("null") || v.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(v.to_string())
    }
}

// =============================================================================
// clarify
// =============================================================================

/// Decides whether the request needs one clarifying question
pub struct ClarifyVertex {
    id: VertexId,
    ctx: Arc<StepContext>,
}

impl ClarifyVertex {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self {
            id: VertexId::from(CLARIFY),
            ctx,
        }
    }
}

#[async_trait]
impl Vertex<SessionState> for ClarifyVertex {
    fn id(&self) -> &VertexId {
        &self.id
    }

    async fn compute(&self, state: &SessionState) -> Result<StepOutput<SessionUpdate>, PregelError> {
        let prompt = ResearchPrompts::clarify(&render_conversation(&state.messages));
        let answer: ClarifyWithUser = self
            .ctx
            .ask(prompt)
            .await
            .map_err(|e| step_error(CLARIFY, e))?;

        let question = answer.question.trim();
        if answer.need_clarification && !question.is_empty() {
            if state.has_asked(question) {
                debug!(question, "Clarifying question already asked, proceeding");
            } else {
                info!(node = CLARIFY, question, "Asking for clarification");
                let mut update = SessionUpdate::say(question)
                    .with_clarification(question)
                    .with_step("Awaiting clarification");
                if let Some(directive) = answer.directive() {
                    update = update.with_requested_visualization(directive);
                }
                return Ok(StepOutput::branch(
                    update,
                    ScopeDecision::NeedsClarification.branch(),
                ));
            }
        }

        let verification = match answer.verification.trim() {
            "" => DEFAULT_VERIFICATION,
            v => v,
        };
        let mut update = SessionUpdate::say(verification).with_step("Scope confirmed");
        if let Some(directive) = answer.directive() {
            update = update.with_requested_visualization(directive);
        }

        info!(node = CLARIFY, has_location = answer.has_location, "Scope confirmed");
        Ok(StepOutput::branch(update, ScopeDecision::Proceed.branch()))
    }

    fn fallback(&self, _state: &SessionState, error: &PregelError) -> StepOutput<SessionUpdate> {
        let update = SessionUpdate::say(format!(
            "Could not check whether clarification is needed ({}). Proceeding with the request as given.",
            failure_reason(error)
        ))
        .with_step("Scope check skipped");
        StepOutput::branch(update, ScopeDecision::Proceed.branch())
    }
}

// =============================================================================
// write_brief
// =============================================================================

/// Restates the conversation as a research brief
pub struct BriefVertex {
    id: VertexId,
    ctx: Arc<StepContext>,
}

impl BriefVertex {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self {
            id: VertexId::from(WRITE_BRIEF),
            ctx,
        }
    }
}

/// Brief from the model answer, or the joined user turns when degenerate
pub fn build_brief(state: &SessionState, answer: Option<&ResearchQuestion>) -> ResearchBrief {
    let text = answer
        .map(|a| a.research_brief.trim())
        .filter(|t| t.chars().count() >= MIN_BRIEF_CHARS)
        .map(str::to_string)
        .unwrap_or_else(|| state.joined_user_turns());

    let brief = ResearchBrief::new(text);
    match brief_directive(answer, state.requested_visualization.as_ref()) {
        Some(directive) => brief.with_visualization(directive),
        None => brief,
    }
}

fn brief_directive(
    answer: Option<&ResearchQuestion>,
    requested: Option<&VisualizationDirective>,
) -> Option<VisualizationDirective> {
    let data = answer
        .and_then(|a| a.graph_data.as_ref())
        .map(points_from_json)
        .unwrap_or_default();
    let kind = answer
        .and_then(|a| meaningful(&a.graph_type))
        .or_else(|| requested.map(|r| r.chart_kind.clone()));
    let x_label = answer
        .and_then(|a| meaningful(&a.x_axis))
        .or_else(|| requested.map(|r| r.x_label.clone()));
    let y_label = answer
        .and_then(|a| meaningful(&a.y_axis))
        .or_else(|| requested.map(|r| r.y_label.clone()));

    if kind.is_none() && x_label.is_none() && y_label.is_none() && data.is_empty() {
        return None;
    }

    let defaults = VisualizationDirective::default();
    Some(VisualizationDirective {
        chart_kind: kind.unwrap_or(defaults.chart_kind),
        x_label: x_label.unwrap_or(defaults.x_label),
        y_label: y_label.unwrap_or(defaults.y_label),
        data,
    })
}

#[async_trait]
impl Vertex<SessionState> for BriefVertex {
    fn id(&self) -> &VertexId {
        &self.id
    }

    async fn compute(&self, state: &SessionState) -> Result<StepOutput<SessionUpdate>, PregelError> {
        let prompt = ResearchPrompts::research_brief(&render_conversation(&state.messages));
        let answer: ResearchQuestion = self
            .ctx
            .ask(prompt)
            .await
            .map_err(|e| step_error(WRITE_BRIEF, e))?;

        let brief = build_brief(state, Some(&answer));
        info!(
            node = WRITE_BRIEF,
            brief_len = brief.text.len(),
            visualization = brief.visualization.is_some(),
            "Research brief written"
        );

        let update = SessionUpdate::say(&brief.text)
            .with_brief(brief)
            .with_step("Research brief written");
        Ok(StepOutput::new(update))
    }

    fn fallback(&self, state: &SessionState, error: &PregelError) -> StepOutput<SessionUpdate> {
        let brief = build_brief(state, None);
        let update = SessionUpdate::say(format!(
            "Could not write a research brief ({}). Using the request as written.",
            failure_reason(error)
        ))
        .and_say(&brief.text)
        .with_brief(brief)
        .with_step("Research brief written");
        StepOutput::new(update)
    }
}

// =============================================================================
// plan
// =============================================================================

/// Breaks the brief into search steps
pub struct PlanVertex {
    id: VertexId,
    ctx: Arc<StepContext>,
}

impl PlanVertex {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self {
            id: VertexId::from(PLAN),
            ctx,
        }
    }
}

#[async_trait]
impl Vertex<SessionState> for PlanVertex {
    fn id(&self) -> &VertexId {
        &self.id
    }

    async fn compute(&self, state: &SessionState) -> Result<StepOutput<SessionUpdate>, PregelError> {
        let prompt = ResearchPrompts::plan(&state.brief_text());
        let output: PlanOutput = self
            .ctx
            .ask(prompt)
            .await
            .map_err(|e| step_error(PLAN, e))?;

        let plan = output.into_plan();
        info!(node = PLAN, steps = plan.len(), "Research plan created");

        let update = SessionUpdate::say(format!("Research plan created with {} steps.", plan.len()))
            .with_plan(plan)
            .with_step("Planning completed");
        Ok(StepOutput::new(update))
    }

    fn fallback(&self, _state: &SessionState, error: &PregelError) -> StepOutput<SessionUpdate> {
        let update = SessionUpdate::say(format!(
            "Could not create a research plan ({}). No queries will be run.",
            failure_reason(error)
        ))
        .with_plan(ResearchPlan::default())
        .with_step("Planning failed");
        StepOutput::new(update)
    }
}

// =============================================================================
// gather
// =============================================================================

/// Runs one search per plan step, in plan order
pub struct GatherVertex {
    id: VertexId,
    ctx: Arc<StepContext>,
}

impl GatherVertex {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self {
            id: VertexId::from(GATHER),
            ctx,
        }
    }

    async fn search_item(&self, query: &str) -> InformationItem {
        let search = &self.ctx.search;
        let response = search.search(query, self.ctx.config.max_search_results).await;

        let mut metadata = Map::new();
        metadata.insert("result_count".into(), Value::from(response.results.len()));
        metadata.insert("backend".into(), Value::from(search.name()));
        if let Some(error) = &response.error {
            warn!(query, error = %error, "Search returned an error");
            metadata.insert("error".into(), Value::from(error.as_str()));
        }

        InformationItem {
            query: query.to_string(),
            source: response
                .first_url()
                .map(str::to_string)
                .unwrap_or_else(|| "web_search".to_string()),
            snippet: response.format(query),
            metadata: Some(metadata),
        }
    }
}

#[async_trait]
impl Vertex<SessionState> for GatherVertex {
    fn id(&self) -> &VertexId {
        &self.id
    }

    async fn compute(&self, state: &SessionState) -> Result<StepOutput<SessionUpdate>, PregelError> {
        let iteration = state.iterations + 1;
        let queries: Vec<&str> = state
            .research_plan
            .as_ref()
            .map(|p| p.queries().collect())
            .unwrap_or_default();

        let mut gathered = GatheredInformation {
            topic: state.brief_text(),
            items: state.gathered_information.items.clone(),
        };
        for query in &queries {
            gathered.items.push(self.search_item(query).await);
        }

        info!(node = GATHER, iteration, queries = queries.len(), total_items = gathered.len(), "Information gathered");

        let message = if queries.is_empty() {
            format!("No queries to run. Iteration {}", iteration)
        } else {
            format!("Information gathered. Iteration {}", iteration)
        };
        let update = SessionUpdate::say(message)
            .with_gathered(gathered)
            .with_iterations(iteration)
            .with_step(format!("Gathering info (Iteration {})", iteration));
        Ok(StepOutput::new(update))
    }

    fn fallback(&self, state: &SessionState, error: &PregelError) -> StepOutput<SessionUpdate> {
        let iteration = state.iterations + 1;
        let update = SessionUpdate::say(format!(
            "Information gathering failed ({}). Iteration {}",
            failure_reason(error),
            iteration
        ))
        .with_iterations(iteration)
        .with_step(format!("Gathering info (Iteration {})", iteration));
        StepOutput::new(update)
    }
}

// =============================================================================
// chart
// =============================================================================

/// Renders a chart from gathered data when the chart mode asks for one
pub struct ChartVertex {
    id: VertexId,
    ctx: Arc<StepContext>,
}

impl ChartVertex {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self {
            id: VertexId::from(CHART),
            ctx,
        }
    }

    fn directive(&self, state: &SessionState) -> Option<VisualizationDirective> {
        let requested = state.visualization().cloned();
        match self.ctx.config.chart_mode {
            ChartMode::Never => None,
            ChartMode::WhenRequested => requested,
            ChartMode::Always => Some(requested.unwrap_or_default()),
        }
    }
}

#[async_trait]
impl Vertex<SessionState> for ChartVertex {
    fn id(&self) -> &VertexId {
        &self.id
    }

    async fn compute(&self, state: &SessionState) -> Result<StepOutput<SessionUpdate>, PregelError> {
        let Some(directive) = self.directive(state) else {
            debug!(node = CHART, mode = %self.ctx.config.chart_mode, "No chart for this session");
            return Ok(StepOutput::new(
                SessionUpdate::say("No visualization requested. Skipping chart.")
                    .with_step("Chart skipped"),
            ));
        };

        let kind: ChartKind = match directive.chart_kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(node = CHART, kind = %directive.chart_kind, "Unsupported chart kind");
                return Ok(StepOutput::new(
                    SessionUpdate::say(format!("Error: {}", e)).with_step("Chart failed"),
                ));
            }
        };

        let (points, origin) = chart_points(
            &directive.data,
            &state.gathered_information.items,
            kind,
            &directive.x_label,
            &directive.y_label,
        );

        let request = ChartRequest {
            title: CHART_TITLE.to_string(),
            kind: kind.to_string(),
            x_label: directive.x_label.clone(),
            y_label: directive.y_label.clone(),
            points: points.clone(),
            file_name: format!("research_graph_{}.png", state.iterations),
        };
        let path = self
            .ctx
            .charts
            .render(&request)
            .map_err(|e| step_error(CHART, e.into()))?;
        let path = path.display().to_string();

        let mut graphs = state.graphs.clone();
        graphs.push(Graph {
            title: request.title,
            kind,
            x_label: request.x_label,
            y_label: request.y_label,
            points,
            path: Some(path.clone()),
        });
        let mut paths = state.graph_paths.clone();
        paths.push(path.clone());

        info!(node = CHART, ?origin, path = %path, "Chart rendered");
        let update = SessionUpdate::say(format!("{} Graph saved to: {}", origin.describe(), path))
            .with_graphs(graphs, paths)
            .with_step("Chart generated");
        Ok(StepOutput::new(update))
    }

    fn fallback(&self, _state: &SessionState, error: &PregelError) -> StepOutput<SessionUpdate> {
        StepOutput::new(
            SessionUpdate::say(format!("Error: {}", failure_reason(error))).with_step("Chart failed"),
        )
    }
}

// =============================================================================
// evaluate
// =============================================================================

/// Decides whether to gather again or write the report
pub struct EvaluateVertex {
    id: VertexId,
    ctx: Arc<StepContext>,
}

impl EvaluateVertex {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self {
            id: VertexId::from(EVALUATE),
            ctx,
        }
    }

    fn sufficient(note: &str) -> StepOutput<SessionUpdate> {
        StepOutput::branch(
            SessionUpdate::say(note).with_step("Evaluation complete"),
            Sufficiency::Sufficient.branch(),
        )
    }

    /// Replace the plan with follow-ups and loop back to gather
    fn insufficient(
        &self,
        state: &SessionState,
        follow_ups: Vec<String>,
        update: SessionUpdate,
    ) -> StepOutput<SessionUpdate> {
        let plan = ResearchPlan::from_queries(follow_ups);
        let reflection = self.ctx.reflection.record(&format!(
            "Iteration {} of {}: {} items gathered, {} follow-up queries planned.",
            state.iterations,
            state.max_iterations,
            state.gathered_information.len(),
            plan.len()
        ));
        StepOutput::branch(
            update
                .and_say("More info needed.")
                .and_say(reflection)
                .with_plan(plan)
                .with_step("Evaluation requested more info"),
            Sufficiency::Insufficient.branch(),
        )
    }
}

/// "More info on <query>" for every gathered item
pub fn derived_follow_ups(state: &SessionState) -> Vec<String> {
    state
        .gathered_information
        .items
        .iter()
        .map(|i| format!("More info on {}", i.query))
        .collect()
}

#[async_trait]
impl Vertex<SessionState> for EvaluateVertex {
    fn id(&self) -> &VertexId {
        &self.id
    }

    async fn compute(&self, state: &SessionState) -> Result<StepOutput<SessionUpdate>, PregelError> {
        if state.iteration_budget_spent() {
            info!(node = EVALUATE, iterations = state.iterations, "Iteration budget spent");
            return Ok(Self::sufficient("Enough information collected."));
        }

        match self.ctx.config.evaluation_policy {
            EvaluationPolicy::IterationBudget => {
                Ok(self.insufficient(state, derived_follow_ups(state), SessionUpdate::default()))
            }
            EvaluationPolicy::ModelJudged => {
                let prompt = ResearchPrompts::sufficiency(
                    &state.brief_text(),
                    &state.gathered_information.render(),
                );
                match self.ctx.ask::<SufficiencyJudgment>(prompt).await {
                    Ok(judgment) => {
                        let evaluation = EvaluationResult {
                            topic: state.brief_text(),
                            criteria: judgment.criteria,
                        };
                        if judgment.sufficient {
                            info!(node = EVALUATE, "Model judged information sufficient");
                            let mut output = Self::sufficient("Information judged sufficient.");
                            output.update.evaluation = Some(evaluation);
                            return Ok(output);
                        }
                        let follow_ups: Vec<String> = judgment
                            .follow_up_queries
                            .into_iter()
                            .filter(|q| !q.trim().is_empty())
                            .collect();
                        let follow_ups = if follow_ups.is_empty() {
                            derived_follow_ups(state)
                        } else {
                            follow_ups
                        };
                        let update = SessionUpdate::default().with_evaluation(evaluation);
                        Ok(self.insufficient(state, follow_ups, update))
                    }
                    Err(e) => {
                        warn!(node = EVALUATE, error = %e, "Sufficiency judgment unavailable");
                        let update = SessionUpdate::say(format!(
                            "Sufficiency judgment unavailable ({}). Treating information as insufficient.",
                            e
                        ));
                        Ok(self.insufficient(state, derived_follow_ups(state), update))
                    }
                }
            }
        }
    }

    fn fallback(&self, state: &SessionState, _error: &PregelError) -> StepOutput<SessionUpdate> {
        if state.iteration_budget_spent() {
            Self::sufficient("Enough information collected.")
        } else {
            self.insufficient(state, derived_follow_ups(state), SessionUpdate::default())
        }
    }
}

// =============================================================================
// report
// =============================================================================

/// Synthesizes the final report
pub struct ReportVertex {
    id: VertexId,
    ctx: Arc<StepContext>,
}

impl ReportVertex {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self {
            id: VertexId::from(REPORT),
            ctx,
        }
    }
}

#[async_trait]
impl Vertex<SessionState> for ReportVertex {
    fn id(&self) -> &VertexId {
        &self.id
    }

    async fn compute(&self, state: &SessionState) -> Result<StepOutput<SessionUpdate>, PregelError> {
        let brief = state.brief_text();
        let prompt = ResearchPrompts::report(&brief, &state.gathered_information.render());
        let report: ResearchReport = self
            .ctx
            .ask(prompt)
            .await
            .map_err(|e| step_error(REPORT, e))?;

        let report = report.normalized(&brief, &state.gathered_information);
        info!(
            node = REPORT,
            findings = report.key_findings.len(),
            sections = report.sections.len(),
            "Report generated"
        );

        let update = SessionUpdate::say(format!("Report generated: {}", report.topic))
            .with_report(report)
            .with_step("Report generation complete");
        Ok(StepOutput::new(update))
    }

    fn fallback(&self, state: &SessionState, error: &PregelError) -> StepOutput<SessionUpdate> {
        let report = ResearchReport::fallback(&state.brief_text(), &state.gathered_information);
        let update = SessionUpdate::say(format!(
            "Report synthesis failed ({}). Assembled the report from gathered data.",
            failure_reason(error)
        ))
        .and_say(format!("Report generated: {}", report.topic))
        .with_report(report)
        .with_step("Report generation complete");
        StepOutput::new(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMResponse;
    use crate::pregel::WorkflowState;
    use crate::tools::{ChartError, DataPoint, SearchHit, SearchResponse};
    use crate::tools::ImageChartRenderer;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replies with a fixed text, or fails when none is set
    struct FixedLLM {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedLLM {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for FixedLLM {
        async fn complete(
            &self,
            messages: &[Message],
            _config: Option<&LLMConfig>,
        ) -> Result<LLMResponse, AgentError> {
            if let Some(m) = messages.last() {
                self.prompts.lock().unwrap().push(m.content.clone());
            }
            match &self.reply {
                Some(text) => Ok(LLMResponse::new(Message::assistant(text))),
                None => Err(AgentError::Llm("connection refused".into())),
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn default_model(&self) -> &str {
            "fixed-model"
        }
    }

    struct EchoSearch;

    #[async_trait]
    impl WebSearch for EchoSearch {
        async fn search(&self, query: &str, _max_results: usize) -> SearchResponse {
            if query.contains("fail") {
                return SearchResponse::failed("Search failed: timeout");
            }
            SearchResponse::ok(vec![SearchHit::new(
                format!("About {}", query),
                format!("https://example.com/{}", query.replace(' ', "-")),
                "Year: 2020, Price: 2.5",
            )])
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        requests: Mutex<Vec<ChartRequest>>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&self, request: &ChartRequest) -> Result<PathBuf, ChartError> {
            let _: ChartKind = request.kind.parse()?;
            self.requests.lock().unwrap().push(request.clone());
            Ok(PathBuf::from("graphs").join(&request.file_name))
        }
    }

    fn context(llm: FixedLLM, config: ResearchConfig) -> Arc<StepContext> {
        Arc::new(StepContext::new(
            Arc::new(llm),
            Arc::new(EchoSearch),
            Arc::new(RecordingRenderer::default()),
            config,
        ))
    }

    async fn run_vertex<V: Vertex<SessionState>>(
        vertex: &V,
        state: &SessionState,
    ) -> (SessionState, Option<String>) {
        let output = match vertex.compute(state).await {
            Ok(output) => output,
            Err(e) => vertex.fallback(state, &e),
        };
        (state.apply_update(output.update), output.branch)
    }

    fn briefed_state() -> SessionState {
        let mut state = SessionState::new("Gym prices in Kampala", 2);
        state.research_brief = Some(ResearchBrief::new("I want gym prices in Kampala by year"));
        state
    }

    #[tokio::test]
    async fn test_clarify_asks_question() {
        let reply = r#"{"need_clarification": true, "has_location": false, "needs_visualization": false,
            "question": "Which city should I focus on?", "verification": ""}"#;
        let vertex = ClarifyVertex::new(context(FixedLLM::replying(reply), ResearchConfig::default()));
        let state = SessionState::new("Best coffee shops", 2);

        let (next, branch) = run_vertex(&vertex, &state).await;

        assert_eq!(branch.as_deref(), Some("needs_clarification"));
        assert_eq!(next.clarification.as_deref(), Some("Which city should I focus on?"));
        assert_eq!(next.last_message().unwrap(), &Message::assistant("Which city should I focus on?"));
    }

    #[tokio::test]
    async fn test_clarify_does_not_repeat_question() {
        let reply = r#"{"need_clarification": true, "question": "Which city should I focus on?", "verification": ""}"#;
        let vertex = ClarifyVertex::new(context(FixedLLM::replying(reply), ResearchConfig::default()));
        let mut state = SessionState::new("Best coffee shops", 2);
        state.messages.push(Message::assistant("Which city should I focus on?"));
        state.messages.push(Message::user("I don't mind"));

        let (next, branch) = run_vertex(&vertex, &state).await;

        assert_eq!(branch.as_deref(), Some("proceed"));
        assert!(next.clarification.is_none());
        assert_eq!(next.last_message().unwrap().content, DEFAULT_VERIFICATION);
    }

    #[tokio::test]
    async fn test_clarify_captures_visualization() {
        let reply = r#"{"need_clarification": false, "has_location": true, "needs_visualization": true,
            "graph_type": "line", "x_axis": "Year", "y_axis": "null", "question": "",
            "verification": "Starting research."}"#;
        let vertex = ClarifyVertex::new(context(FixedLLM::replying(reply), ResearchConfig::default()));

        let (next, branch) = run_vertex(&vertex, &SessionState::new("Coffee price trend", 2)).await;

        assert_eq!(branch.as_deref(), Some("proceed"));
        let directive = next.requested_visualization.unwrap();
        assert_eq!(directive.chart_kind, "line");
        assert_eq!(directive.x_label, "Year");
        assert_eq!(directive.y_label, "Y");
    }

    #[tokio::test]
    async fn test_clarify_model_failure_proceeds() {
        let vertex = ClarifyVertex::new(context(FixedLLM::failing(), ResearchConfig::default()));

        let (next, branch) = run_vertex(&vertex, &SessionState::new("Best coffee shops", 2)).await;

        assert_eq!(branch.as_deref(), Some("proceed"));
        assert!(next.last_message().unwrap().content.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_brief_short_text_falls_back_to_user_turns() {
        let reply = r#"{"research_brief": "coffee", "graph_type": null}"#;
        let vertex = BriefVertex::new(context(FixedLLM::replying(reply), ResearchConfig::default()));
        let mut state = SessionState::new("Best coffee shops", 2);
        state.messages.push(Message::assistant("Which city?"));
        state.messages.push(Message::user("Nairobi"));

        let (next, _) = run_vertex(&vertex, &state).await;

        let brief = next.research_brief.unwrap();
        assert_eq!(brief.text, "Best coffee shops Nairobi");
        assert!(brief.visualization.is_none());
    }

    #[tokio::test]
    async fn test_brief_with_graph_data() {
        let reply = r#"{"research_brief": "I want a report on gyms in Kampala with a price chart.",
            "graph_type": "bar", "x_axis": "Gym names", "y_axis": "Monthly price (UGX)",
            "graph_data": [{"name": "Gym A", "price": 120000}, {"name": "Gym B", "price": 150000}]}"#;
        let vertex = BriefVertex::new(context(FixedLLM::replying(reply), ResearchConfig::default()));

        let (next, _) = run_vertex(&vertex, &SessionState::new("Gym price graph Kampala", 2)).await;

        let directive = next.research_brief.unwrap().visualization.unwrap();
        assert_eq!(directive.chart_kind, "bar");
        assert_eq!(directive.x_label, "Gym names");
        assert_eq!(
            directive.data,
            vec![DataPoint::new("Gym A", 120000.0), DataPoint::new("Gym B", 150000.0)]
        );
    }

    #[tokio::test]
    async fn test_brief_carries_scoped_visualization() {
        let reply = r#"{"research_brief": "I want to see coffee prices in Nairobi over the years."}"#;
        let vertex = BriefVertex::new(context(FixedLLM::replying(reply), ResearchConfig::default()));
        let mut state = SessionState::new("Coffee price trend in Nairobi as a pie", 2);
        state.requested_visualization = Some(VisualizationDirective {
            chart_kind: "pie".into(),
            ..Default::default()
        });

        let (next, _) = run_vertex(&vertex, &state).await;

        assert_eq!(next.visualization().unwrap().chart_kind, "pie");
    }

    #[tokio::test]
    async fn test_brief_model_failure_uses_user_turns() {
        let vertex = BriefVertex::new(context(FixedLLM::failing(), ResearchConfig::default()));

        let (next, _) = run_vertex(&vertex, &SessionState::new("Best coffee shops in Nairobi", 2)).await;

        assert_eq!(next.brief_text(), "Best coffee shops in Nairobi");
        assert!(next.messages.iter().any(|m| m.content.contains("Could not write a research brief")));
    }

    #[tokio::test]
    async fn test_plan_accepts_query_list() {
        let reply = r#"Here is the plan: ["gym prices Kampala", "gym reviews Kampala"]"#;
        let vertex = PlanVertex::new(context(FixedLLM::replying(reply), ResearchConfig::default()));

        let (next, _) = run_vertex(&vertex, &briefed_state()).await;

        let plan = next.research_plan.unwrap();
        assert_eq!(plan.queries().collect::<Vec<_>>(), vec!["gym prices Kampala", "gym reviews Kampala"]);
        assert_eq!(plan.steps[1].step_number, 2);
    }

    #[tokio::test]
    async fn test_plan_renumbers_structured_steps() {
        let reply = r#"{"steps": [{"step_number": 4, "action": "search", "description": "a"},
            {"step_number": 9, "action": "analyze", "description": "b"}]}"#;
        let vertex = PlanVertex::new(context(FixedLLM::replying(reply), ResearchConfig::default()));

        let (next, _) = run_vertex(&vertex, &briefed_state()).await;

        let numbers: Vec<u32> = next.research_plan.as_ref().unwrap().steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(next.last_message().unwrap().content, "Research plan created with 2 steps.");
    }

    #[tokio::test]
    async fn test_plan_malformed_output_gives_empty_plan() {
        let vertex = PlanVertex::new(context(
            FixedLLM::replying("I will search for gyms."),
            ResearchConfig::default(),
        ));

        let (next, _) = run_vertex(&vertex, &briefed_state()).await;

        assert!(next.research_plan.as_ref().unwrap().is_empty());
        assert!(next.last_message().unwrap().content.contains("Could not create a research plan"));
    }

    #[tokio::test]
    async fn test_gather_in_plan_order_and_counts_iteration() {
        let vertex = GatherVertex::new(context(FixedLLM::failing(), ResearchConfig::default()));
        let mut state = briefed_state();
        state.research_plan = Some(ResearchPlan::from_queries(["first query", "will fail", "third query"]));

        let (next, _) = run_vertex(&vertex, &state).await;

        assert_eq!(next.iterations, 1);
        let items = &next.gathered_information.items;
        let queries: Vec<&str> = items.iter().map(|i| i.query.as_str()).collect();
        assert_eq!(queries, vec!["first query", "will fail", "third query"]);
        assert_eq!(items[0].source, "https://example.com/first-query");
        assert_eq!(items[1].source, "web_search");
        assert_eq!(items[1].snippet, crate::tools::NO_RESULTS);
        assert!(items[1].metadata.as_ref().unwrap().contains_key("error"));
        assert_eq!(next.gathered_information.topic, "I want gym prices in Kampala by year");
    }

    #[tokio::test]
    async fn test_gather_empty_plan_still_counts() {
        let vertex = GatherVertex::new(context(FixedLLM::failing(), ResearchConfig::default()));
        let mut state = briefed_state();
        state.research_plan = Some(ResearchPlan::default());

        let (next, _) = run_vertex(&vertex, &state).await;

        assert_eq!(next.iterations, 1);
        assert!(next.gathered_information.is_empty());
        assert_eq!(next.last_message().unwrap().content, "No queries to run. Iteration 1");
    }

    #[tokio::test]
    async fn test_chart_extracts_labelled_pairs() {
        let vertex = ChartVertex::new(context(FixedLLM::failing(), ResearchConfig::default()));
        let mut state = briefed_state();
        state.research_brief = Some(ResearchBrief::new("I want gym prices").with_visualization(
            VisualizationDirective {
                chart_kind: "bar".into(),
                x_label: "Year".into(),
                y_label: "Price".into(),
                data: vec![],
            },
        ));
        state.gathered_information.items.push(InformationItem {
            query: "gym prices".into(),
            source: "web_search".into(),
            snippet: "Year: 2020, Price: 2.5".into(),
            metadata: None,
        });
        state.iterations = 1;
        state.graph_paths = vec!["graphs/earlier.png".into()];

        let (next, _) = run_vertex(&vertex, &state).await;

        assert_eq!(next.graph_paths, vec!["graphs/earlier.png", "graphs/research_graph_1.png"]);
        assert_eq!(next.graphs[0].points, vec![DataPoint::new("2020", 2.5)]);
        assert!(next.last_message().unwrap().content.starts_with("Graph created from extracted data."));
    }

    #[tokio::test]
    async fn test_chart_unsupported_kind_reports_error() {
        let vertex = ChartVertex::new(context(FixedLLM::failing(), ResearchConfig::default()));
        let mut state = briefed_state();
        state.research_brief = Some(ResearchBrief::new("brief").with_visualization(
            VisualizationDirective {
                chart_kind: "scatter".into(),
                ..Default::default()
            },
        ));

        let (next, _) = run_vertex(&vertex, &state).await;

        assert!(next.graph_paths.is_empty());
        assert!(next.last_message().unwrap().content.contains("'scatter'"));
    }

    #[tokio::test]
    async fn test_chart_mode_controls_rendering() {
        let never = ChartVertex::new(context(
            FixedLLM::failing(),
            ResearchConfig::default().with_chart_mode(ChartMode::Never),
        ));
        let mut state = briefed_state();
        state.research_brief = Some(
            ResearchBrief::new("brief").with_visualization(VisualizationDirective::default()),
        );
        let (next, _) = run_vertex(&never, &state).await;
        assert!(next.graph_paths.is_empty());

        let always = ChartVertex::new(context(
            FixedLLM::failing(),
            ResearchConfig::default().with_chart_mode(ChartMode::Always),
        ));
        let (next, _) = run_vertex(&always, &briefed_state()).await;
        assert_eq!(next.graph_paths.len(), 1);
        // Nothing gathered, so the data is synthesized
        assert_eq!(next.graphs[0].points.len(), 10);
    }

    #[tokio::test]
    async fn test_chart_with_nothing_gathered_writes_each_kind() {
        let dir = TempDir::new().unwrap();
        let ctx = Arc::new(StepContext::new(
            Arc::new(FixedLLM::failing()),
            Arc::new(EchoSearch),
            Arc::new(ImageChartRenderer::new(dir.path())),
            ResearchConfig::default().with_chart_mode(ChartMode::Always),
        ));
        let vertex = ChartVertex::new(ctx);

        for (iteration, kind) in ["bar", "line", "pie"].into_iter().enumerate() {
            let mut state = briefed_state();
            state.iterations = iteration as u32 + 1;
            state.research_brief = Some(ResearchBrief::new("brief").with_visualization(
                VisualizationDirective {
                    chart_kind: kind.into(),
                    ..Default::default()
                },
            ));

            let (next, _) = run_vertex(&vertex, &state).await;

            assert_eq!(next.graph_paths.len(), 1, "{} chart missing", kind);
            assert!(std::path::Path::new(&next.graph_paths[0]).exists());
            assert!(!next.graphs[0].points.is_empty());
            assert_eq!(next.current_step, "Chart generated");
        }

        // No directive at all falls back to the default bar chart
        let mut state = briefed_state();
        state.iterations = 4;
        let (next, _) = run_vertex(&vertex, &state).await;
        assert_eq!(next.graphs[0].kind, ChartKind::Bar);
        assert!(dir.path().join("research_graph_4.png").exists());
    }

    #[tokio::test]
    async fn test_evaluate_budget_spent_is_sufficient() {
        let vertex = EvaluateVertex::new(context(FixedLLM::failing(), ResearchConfig::default()));
        let mut state = briefed_state();
        state.iterations = 2;

        let (next, branch) = run_vertex(&vertex, &state).await;

        assert_eq!(branch.as_deref(), Some("sufficient"));
        assert_eq!(next.last_message().unwrap().content, "Enough information collected.");
    }

    #[tokio::test]
    async fn test_evaluate_replaces_plan_with_follow_ups() {
        let vertex = EvaluateVertex::new(context(FixedLLM::failing(), ResearchConfig::default()));
        let mut state = briefed_state();
        state.iterations = 1;
        state.research_plan = Some(ResearchPlan::from_queries(["old"]));
        state.gathered_information.items.push(InformationItem {
            query: "gym prices".into(),
            source: "web_search".into(),
            snippet: "".into(),
            metadata: None,
        });

        let (next, branch) = run_vertex(&vertex, &state).await;

        assert_eq!(branch.as_deref(), Some("insufficient"));
        let plan = next.research_plan.unwrap();
        assert_eq!(plan.queries().collect::<Vec<_>>(), vec!["More info on gym prices"]);
        assert!(next.messages.iter().any(|m| m.content == "More info needed."));
        assert!(next.messages.iter().any(|m| m.content.starts_with("Reflection recorded: Iteration 1 of 2")));
        assert!(next.evaluation.is_none());
    }

    #[tokio::test]
    async fn test_evaluate_model_judged_sufficient() {
        let reply = r#"{"sufficient": true, "criteria": [{"criterion": "coverage", "score": 8, "comment": "good"}]}"#;
        let config = ResearchConfig::default().with_evaluation_policy(EvaluationPolicy::ModelJudged);
        let vertex = EvaluateVertex::new(context(FixedLLM::replying(reply), config));
        let mut state = briefed_state();
        state.iterations = 1;

        let (next, branch) = run_vertex(&vertex, &state).await;

        assert_eq!(branch.as_deref(), Some("sufficient"));
        assert_eq!(next.evaluation.unwrap().criteria[0].criterion, "coverage");
    }

    #[tokio::test]
    async fn test_evaluate_model_judged_failure_is_insufficient() {
        let config = ResearchConfig::default().with_evaluation_policy(EvaluationPolicy::ModelJudged);
        let vertex = EvaluateVertex::new(context(FixedLLM::replying("SUFFICIENT"), config));
        let mut state = briefed_state();
        state.iterations = 1;

        let (_, branch) = run_vertex(&vertex, &state).await;

        assert_eq!(branch.as_deref(), Some("insufficient"));
    }

    #[tokio::test]
    async fn test_report_normalizes_model_output() {
        let reply = r#"{"topic": "Gyms in Kampala", "summary": "", "key_findings": []}"#;
        let vertex = ReportVertex::new(context(FixedLLM::replying(reply), ResearchConfig::default()));
        let mut state = briefed_state();
        state.gathered_information.items.push(InformationItem {
            query: "gym prices".into(),
            source: "https://example.com".into(),
            snippet: "Membership is 120000 UGX.".into(),
            metadata: None,
        });

        let (next, _) = run_vertex(&vertex, &state).await;

        let report = next.research_report.as_ref().unwrap();
        assert_eq!(report.topic, "Gyms in Kampala");
        assert_eq!(report.summary, "Membership is 120000 UGX.");
        assert!(!report.key_findings.is_empty());
        assert!(!report.sections.is_empty());
        assert_eq!(next.last_message().unwrap().content, "Report generated: Gyms in Kampala");
    }

    #[tokio::test]
    async fn test_report_model_failure_builds_fallback() {
        let vertex = ReportVertex::new(context(FixedLLM::failing(), ResearchConfig::default()));

        let (next, _) = run_vertex(&vertex, &briefed_state()).await;

        let report = next.research_report.as_ref().unwrap();
        assert_eq!(report.topic, "I want gym prices in Kampala by year");
        assert!(!report.summary.is_empty());
        assert!(next.messages.iter().any(|m| m.content.contains("Report synthesis failed")));
    }
}
