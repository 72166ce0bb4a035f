//! # Display Module
//!
//! Terminal rendering of a research session: conversation turns as they
//! arrive, then the brief, plan, gathered items, charts and report.

use colored::Colorize;

use digdeep_agents::research::{GatheredInformation, ResearchPlan};
use digdeep_agents::{Message, ResearchReport, Role, SessionState};

/// Characters of each gathered snippet shown in the overview
const SNIPPET_PREVIEW_CHARS: usize = 160;

fn heading(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "─".repeat(title.chars().count()).cyan());
}

fn turn_line(message: &Message) -> String {
    match message.role {
        Role::User => format!("{} {}", "you:".bold().green(), message.content),
        Role::Assistant => format!("{} {}", "agent:".bold().blue(), message.content),
        Role::System => format!("{} {}", "system:".dimmed(), message.content.dimmed()),
    }
}

/// Print turns added since `seen`; returns the new count
pub fn print_new_turns(state: &SessionState, seen: usize) -> usize {
    for message in state.messages.iter().skip(seen) {
        println!("{}", turn_line(message));
    }
    state.messages.len()
}

pub fn print_plan(plan: &ResearchPlan) {
    heading("Research Plan");
    if plan.is_empty() {
        println!("{}", "(no steps)".dimmed());
    }
    for step in &plan.steps {
        println!("{:>2}. [{:?}] {}", step.step_number, step.action, step.description);
    }
}

pub fn print_gathered(gathered: &GatheredInformation) {
    heading(&format!("Gathered Information ({} items)", gathered.len()));
    for item in &gathered.items {
        let preview: String = item.snippet.chars().take(SNIPPET_PREVIEW_CHARS).collect();
        println!("{} {}", "•".yellow(), item.query.bold());
        println!("  {} {}", "source:".dimmed(), item.source);
        println!("  {}", preview.replace('\n', " ").dimmed());
    }
}

pub fn print_report(report: &ResearchReport) {
    heading("Final Report");
    println!("{}", report.to_markdown());
}

/// Everything the session produced, in workflow order
pub fn print_session(state: &SessionState) {
    if let Some(brief) = &state.research_brief {
        heading("Research Brief");
        println!("{}", brief.text);
        if let Some(directive) = &brief.visualization {
            println!(
                "{} {} chart, X: {}, Y: {}",
                "visualization:".dimmed(),
                directive.chart_kind,
                directive.x_label,
                directive.y_label
            );
        }
    }

    if let Some(plan) = &state.research_plan {
        print_plan(plan);
    }

    print_gathered(&state.gathered_information);

    if !state.graph_paths.is_empty() {
        heading("Charts");
        for path in &state.graph_paths {
            println!("{} {}", "▸".magenta(), path);
        }
    }

    if let Some(report) = &state.research_report {
        print_report(report);
    }
}
