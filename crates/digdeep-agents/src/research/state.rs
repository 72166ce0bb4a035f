//! Research session state
//!
//! [`SessionState`] is the single record threaded through the workflow.
//! Steps return a [`SessionUpdate`] carrying only the fields they changed;
//! fields an update leaves as `None` keep their previous value, and
//! messages are only ever appended.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pregel::state::WorkflowState;
use crate::pregel::vertex::StateUpdate;
use crate::state::Message;
use crate::tools::chart::{ChartKind, DataPoint};

/// Chart parameters captured while scoping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationDirective {
    /// Requested chart kind, validated at render time
    pub chart_kind: String,
    pub x_label: String,
    pub y_label: String,
    /// Data the model supplied with the brief, if any
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

impl Default for VisualizationDirective {
    fn default() -> Self {
        Self {
            chart_kind: ChartKind::Bar.to_string(),
            x_label: "X".to_string(),
            y_label: "Y".to_string(),
            data: Vec::new(),
        }
    }
}

/// The user's request restated as a first-person research brief
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchBrief {
    pub text: String,
    #[serde(default)]
    pub visualization: Option<VisualizationDirective>,
}

impl ResearchBrief {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visualization: None,
        }
    }

    pub fn with_visualization(mut self, directive: VisualizationDirective) -> Self {
        self.visualization = Some(directive);
        self
    }
}

/// What a plan step does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum StepAction {
    #[default]
    Search,
    Summarize,
    Analyze,
}

impl From<String> for StepAction {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "summarize" | "summarise" | "summary" => StepAction::Summarize,
            "analyze" | "analyse" | "analysis" => StepAction::Analyze,
            _ => StepAction::Search,
        }
    }
}

/// One planned investigative step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default)]
    pub step_number: u32,
    #[serde(default)]
    pub action: StepAction,
    /// Used verbatim as the search query
    #[serde(alias = "query")]
    pub description: String,
}

impl PlanStep {
    pub fn search(description: impl Into<String>) -> Self {
        Self {
            step_number: 0,
            action: StepAction::Search,
            description: description.into(),
        }
    }
}

/// Ordered research steps, numbered contiguously from 1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub steps: Vec<PlanStep>,
}

impl ResearchPlan {
    /// Build a plan, renumbering steps 1..=n in the given order
    pub fn new(steps: Vec<PlanStep>) -> Self {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, mut step)| {
                step.step_number = i as u32 + 1;
                step
            })
            .collect();
        Self { steps }
    }

    /// A plan of search steps, one per query
    pub fn from_queries<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(queries.into_iter().map(PlanStep::search).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.description.as_str())
    }
}

/// A search query and what it returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationItem {
    pub query: String,
    /// First result URL, or the backend name when nothing came back
    pub source: String,
    pub snippet: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Everything gathered so far, in plan order across iterations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatheredInformation {
    pub topic: String,
    pub items: Vec<InformationItem>,
}

impl GatheredInformation {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// "Query: ..\nResults: .." blocks for prompts
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("Query: {}\nResults: {}", i.query, i.snippet))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub score: f64,
    #[serde(default)]
    pub comment: String,
}

/// Criterion scores from a model judgment; never consulted by routing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub topic: String,
    pub criteria: Vec<CriterionScore>,
}

/// A rendered chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<DataPoint>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub content: String,
}

/// Final research report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub sections: Vec<ReportSection>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// The record threaded through one research session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub messages: Vec<Message>,
    pub research_brief: Option<ResearchBrief>,
    pub research_plan: Option<ResearchPlan>,
    pub gathered_information: GatheredInformation,
    pub graphs: Vec<Graph>,
    pub graph_paths: Vec<String>,
    pub evaluation: Option<EvaluationResult>,
    pub research_report: Option<ResearchReport>,
    pub iterations: u32,
    pub max_iterations: u32,
    pub current_step: String,
    /// Pending question when the session halted for clarification
    pub clarification: Option<String>,
    /// Chart request noticed while scoping, before a brief exists
    pub requested_visualization: Option<VisualizationDirective>,
}

impl SessionState {
    /// Fresh state holding only the opening user turn
    pub fn new(opening_message: &str, max_iterations: u32) -> Self {
        Self {
            messages: vec![Message::user(opening_message)],
            max_iterations,
            ..Default::default()
        }
    }

    pub fn user_turns(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_user())
    }

    /// All user turns joined by single spaces
    pub fn joined_user_turns(&self) -> String {
        self.user_turns()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether an assistant turn already contains exactly this text
    pub fn has_asked(&self, question: &str) -> bool {
        let question = question.trim();
        !question.is_empty()
            && self
                .messages
                .iter()
                .any(|m| m.is_assistant() && m.content.trim() == question)
    }

    /// Brief text, or the user's own words before a brief exists
    pub fn brief_text(&self) -> String {
        match &self.research_brief {
            Some(brief) => brief.text.clone(),
            None => self.joined_user_turns(),
        }
    }

    pub fn visualization(&self) -> Option<&VisualizationDirective> {
        self.research_brief.as_ref()?.visualization.as_ref()
    }

    pub fn iteration_budget_spent(&self) -> bool {
        self.iterations >= self.max_iterations
    }

    pub fn is_complete(&self) -> bool {
        self.research_report.is_some()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Partial update returned by a research step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// Appended, never replacing
    pub messages: Vec<Message>,
    pub research_brief: Option<ResearchBrief>,
    pub research_plan: Option<ResearchPlan>,
    pub gathered_information: Option<GatheredInformation>,
    pub graphs: Option<Vec<Graph>>,
    pub graph_paths: Option<Vec<String>>,
    pub evaluation: Option<EvaluationResult>,
    pub research_report: Option<ResearchReport>,
    pub iterations: Option<u32>,
    pub max_iterations: Option<u32>,
    pub current_step: Option<String>,
    pub clarification: Option<String>,
    pub requested_visualization: Option<VisualizationDirective>,
}

impl SessionUpdate {
    /// Update carrying a single assistant turn
    pub fn say(text: impl AsRef<str>) -> Self {
        Self {
            messages: vec![Message::assistant(text.as_ref())],
            ..Default::default()
        }
    }

    pub fn and_say(mut self, text: impl AsRef<str>) -> Self {
        self.messages.push(Message::assistant(text.as_ref()));
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    pub fn with_brief(mut self, brief: ResearchBrief) -> Self {
        self.research_brief = Some(brief);
        self
    }

    pub fn with_plan(mut self, plan: ResearchPlan) -> Self {
        self.research_plan = Some(plan);
        self
    }

    pub fn with_gathered(mut self, gathered: GatheredInformation) -> Self {
        self.gathered_information = Some(gathered);
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn with_graphs(mut self, graphs: Vec<Graph>, paths: Vec<String>) -> Self {
        self.graphs = Some(graphs);
        self.graph_paths = Some(paths);
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationResult) -> Self {
        self.evaluation = Some(evaluation);
        self
    }

    pub fn with_report(mut self, report: ResearchReport) -> Self {
        self.research_report = Some(report);
        self
    }

    pub fn with_clarification(mut self, question: impl Into<String>) -> Self {
        self.clarification = Some(question.into());
        self
    }

    pub fn with_requested_visualization(mut self, directive: VisualizationDirective) -> Self {
        self.requested_visualization = Some(directive);
        self
    }
}

impl StateUpdate for SessionUpdate {
    fn empty() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.research_brief.is_none()
            && self.research_plan.is_none()
            && self.gathered_information.is_none()
            && self.graphs.is_none()
            && self.graph_paths.is_none()
            && self.evaluation.is_none()
            && self.research_report.is_none()
            && self.iterations.is_none()
            && self.max_iterations.is_none()
            && self.current_step.is_none()
            && self.clarification.is_none()
            && self.requested_visualization.is_none()
    }
}

impl WorkflowState for SessionState {
    type Update = SessionUpdate;

    fn apply_update(&self, update: Self::Update) -> Self {
        let mut next = self.clone();

        next.messages.extend(update.messages);

        if let Some(brief) = update.research_brief {
            next.research_brief = Some(brief);
        }
        if let Some(plan) = update.research_plan {
            next.research_plan = Some(plan);
        }
        if let Some(gathered) = update.gathered_information {
            next.gathered_information = gathered;
        }
        if let Some(graphs) = update.graphs {
            next.graphs = graphs;
        }
        if let Some(paths) = update.graph_paths {
            next.graph_paths = paths;
        }
        if let Some(evaluation) = update.evaluation {
            next.evaluation = Some(evaluation);
        }
        if let Some(report) = update.research_report {
            next.research_report = Some(report);
        }
        if let Some(iterations) = update.iterations {
            next.iterations = iterations;
        }
        if let Some(max) = update.max_iterations {
            next.max_iterations = max;
        }
        if let Some(step) = update.current_step {
            next.current_step = step;
        }
        if let Some(question) = update.clarification {
            next.clarification = Some(question);
        }
        if let Some(directive) = update.requested_visualization {
            next.requested_visualization = Some(directive);
        }

        next
    }
}
