//! Research workflow prompt templates
//!
//! One template per model-backed step. Every template asks for a JSON
//! answer matching the step's output schema.

use chrono::Local;

/// Prompt templates for the research workflow
pub struct ResearchPrompts;

impl ResearchPrompts {
    /// Today's date as shown to the model, e.g. "Fri Oct 16, 2026"
    pub fn current_date() -> String {
        Local::now().format("%a %b %-d, %Y").to_string()
    }

    /// Decide whether one clarifying question is needed
    pub fn clarify(conversation: &str) -> String {
        format!(
            r#"You are assisting a user with a research request.

Conversation so far:
<Messages>
{conversation}
</Messages>
Date: {date}

Your task: Decide if you need to ask ONE clarifying question.

Rules:
- Ask ONLY if critical info is missing (e.g., location, evaluation criteria, visualization details).
- If the user requested a graph but did not specify details:
  - Clarify graph type (bar, line, pie)
  - Clarify what should go on the X-axis and Y-axis (entities, metrics, units).
- Never repeat a question already asked in the conversation.
- Be concise and professional.

Respond ONLY in this JSON schema:
{{
  "need_clarification": bool,
  "has_location": bool,
  "needs_visualization": bool,
  "graph_type": "<string or null>",
  "x_axis": "<string or null>",
  "y_axis": "<string or null>",
  "question": "<string>",
  "verification": "<string>"
}}

Examples:
User: "Best coffee shops" ->
{{"need_clarification": true, "has_location": false, "needs_visualization": false, "graph_type": null, "x_axis": null, "y_axis": null, "question": "Which city should I focus on?", "verification": ""}}

User: "Best coffee shops in Nairobi" ->
{{"need_clarification": false, "has_location": true, "needs_visualization": false, "graph_type": null, "x_axis": null, "y_axis": null, "question": "", "verification": "I have enough details. I will start research on Nairobi coffee shops."}}
"#,
            conversation = conversation,
            date = Self::current_date(),
        )
    }

    /// Turn the conversation into a first-person research brief
    pub fn research_brief(conversation: &str) -> String {
        format!(
            r#"Translate the user conversation into a clear, detailed, and concrete research brief.

Conversation:
<Messages>
{conversation}
</Messages>
Date: {date}

Guidelines:
1. Capture all user-stated preferences explicitly (location, evaluation focus, visualization requests).
2. Define evaluation criteria and acceptable methods to assess them.
3. Prefer official websites, reputable review organizations and prominent review aggregators as sources.
4. If visualization is requested, state the graph type (bar, line, pie) and the X-axis and Y-axis data.
   Include data points in graph_data only when they are relevant to the topic.
5. Do not invent constraints the user did not state; mark unspecified items as open.
6. Phrase the brief in the first person from the user's perspective ("I want...").

Output must follow this JSON schema:
{{
  "research_brief": "<string>",
  "graph_type": "<string or null>",
  "x_axis": "<string or null>",
  "y_axis": "<string or null>",
  "graph_data": [<list of objects>] or null
}}

Example:
User: "Show me a price graph of gyms in Kampala"
{{
  "research_brief": "I want a report on gyms in Kampala, covering facilities, membership costs, and customer feedback. Include a bar chart comparing monthly membership prices (X-axis: gym names, Y-axis: monthly price in UGX).",
  "graph_type": "bar",
  "x_axis": "Gym names",
  "y_axis": "Monthly price (UGX)",
  "graph_data": [{{"name": "Gym A", "price": 120000}}, {{"name": "Gym B", "price": 150000}}]
}}
"#,
            conversation = conversation,
            date = Self::current_date(),
        )
    }

    /// Break the brief into 3-5 search steps
    pub fn plan(brief: &str) -> String {
        format!(
            r#"You are an expert research assistant. Based on the following research brief,
create a structured step-by-step research plan of 3 to 5 steps.

Research brief: {brief}

Each step description must work as a standalone web search query.

Respond ONLY in this JSON schema:
{{
  "steps": [
    {{"step_number": 1, "action": "search" | "summarize" | "analyze", "description": "<string>"}}
  ]
}}
"#,
            brief = brief,
        )
    }

    /// Judge whether the gathered information answers the brief
    pub fn sufficiency(brief: &str, gathered: &str) -> String {
        format!(
            r#"Based on the following research information, determine if we have enough comprehensive
information to answer the research brief: "{brief}"

Gathered information:
{gathered}

Consider:
1. Have we covered all aspects of the brief?
2. Are there any gaps in our understanding?
3. Do we need to search for more specific information?

Respond ONLY in this JSON schema:
{{
  "sufficient": bool,
  "criteria": [{{"criterion": "<string>", "score": <number 0-10>, "comment": "<string>"}}],
  "follow_up_queries": ["<query>", "..."]
}}
"#,
            brief = brief,
            gathered = gathered,
        )
    }

    /// Synthesize the final report
    pub fn report(brief: &str, gathered: &str) -> String {
        format!(
            r#"Based on the following research info, create a comprehensive, well-structured report.
For context, today's date is {date}.

Research brief: {brief}

Info:
{gathered}

Cite source URLs from the info in the references list.

Respond ONLY in this JSON schema:
{{
  "topic": "<string>",
  "summary": "<string>",
  "key_findings": ["<string>", "..."],
  "sections": [{{"title": "<string>", "content": "<string>"}}],
  "conclusion": "<string or null>",
  "references": ["<url>", "..."]
}}
"#,
            date = Self::current_date(),
            brief = brief,
            gathered = gathered,
        )
    }
}
