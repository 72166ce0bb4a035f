//! # DigDeep
//!
//! A research agent built with the Rig framework.
//!
//! It scopes your question (asking one clarifying question when something
//! critical is missing), writes a research brief, plans web searches,
//! gathers results, charts numeric data when asked, and writes a report.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- "Best coffee shops in Nairobi"
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

/// Wiring of providers, search and charts
mod agent;

/// Terminal rendering
mod display;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use digdeep_agents::{new_session_id, ChartMode, ReportFormat, SessionOutcome};

use crate::config::{Config, LlmProvider};

/// Clarifying questions answered before giving up
const MAX_CLARIFICATION_ROUNDS: usize = 5;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "digdeep",
    version,
    about = "A research agent that scopes, searches, charts, and reports",
    long_about = r#"
DigDeep - scoped web research with a written report.

The agent will:
  1. Ask one clarifying question if your request is missing something critical
  2. Write a research brief and plan 3-5 searches
  3. Search the web, looping until enough information is gathered
  4. Draw a bar, line or pie chart when you ask for one
  5. Write a report with summary, key findings and references

CONFIGURATION (environment or .env):
  LLM_PROVIDER        openai | ollama (default: ollama)
  MODEL               model name (default: llama3.2 / gpt-4.1)
  SEARCH_PROVIDER     tavily | duckduckgo (tavily if TAVILY_API_KEY is set)
  CHART_MODE          always | when-requested | never

EXAMPLES:
  digdeep "Best coffee shops in Nairobi"
  digdeep --chart always --output report.md "Gym membership prices in Kampala"
  digdeep --provider openai --model gpt-4o-mini "Coffee price trend since 2020"
"#
)]
struct Args {
    /// The research question
    #[arg(value_name = "QUERY")]
    query: String,

    /// Model to use (overrides MODEL)
    #[arg(short = 'm', long = "model", env = "MODEL")]
    model: Option<String>,

    /// Language model provider: openai or ollama
    #[arg(short = 'p', long = "provider")]
    provider: Option<LlmProvider>,

    /// Gather/evaluate cycles before the report is written
    #[arg(short = 'i', long = "max-iterations")]
    max_iterations: Option<u32>,

    /// When to draw charts: always, when-requested or never
    #[arg(short = 'c', long = "chart")]
    chart: Option<ChartMode>,

    /// Write the report here (.md, .txt or .json)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,

    /// Do not prompt for clarification; print the question and exit
    #[arg(long = "non-interactive", default_value = "false")]
    non_interactive: bool,
}

impl Args {
    /// Apply command-line overrides on top of the environment
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        if let Some(chart) = self.chart {
            config.chart_mode = chart;
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    info!(
        provider = ?config.provider,
        model = %config.model(),
        search = ?config.search_provider,
        max_iterations = config.max_iterations,
        "Configuration loaded"
    );

    let agent = agent::build_agent(&config)?;
    let session_id = new_session_id();

    let mut outcome = agent
        .start(&session_id, &args.query)
        .await
        .inspect_err(|e| error!(error = %e, "Research failed"))?;
    let mut seen = display::print_new_turns(outcome.state(), 0);
    let mut rounds = 0;

    while let SessionOutcome::NeedsClarification { question, .. } = &outcome {
        if args.non_interactive {
            println!("\n{} {}", "Clarification needed:".bold().yellow(), question);
            return Ok(());
        }
        if rounds == MAX_CLARIFICATION_ROUNDS {
            anyhow::bail!(
                "No report after {} clarification rounds",
                MAX_CLARIFICATION_ROUNDS
            );
        }
        rounds += 1;

        let answer = read_answer()?;
        outcome = agent.reply(&session_id, &answer).await?;
        seen = display::print_new_turns(outcome.state(), seen);
    }

    let state = outcome.into_state();
    display::print_session(&state);

    if let (Some(path), Some(report)) = (&args.output, &state.research_report) {
        report
            .export(path, ReportFormat::from_path(path))
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("\n{} {}", "Report written to".green(), path.display());
    }

    info!(session_id = %session_id, iterations = state.iterations, "Research completed");
    Ok(())
}

/// Read one non-empty line from stdin
fn read_answer() -> Result<String> {
    let stdin = io::stdin();
    loop {
        print!("{} ", ">".bold().green());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read answer from stdin")?;
        if read == 0 {
            anyhow::bail!("stdin closed before the clarifying question was answered");
        }
        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Install the tracing subscriber.
///
/// `--verbose` selects DEBUG, otherwise INFO; `RUST_LOG` overrides both.
/// Logs go to stderr so stdout carries only the session.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
