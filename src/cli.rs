//! Command line surface and plain-text rendering of results.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_OUTPUT_DIR, ResearchConfig};
use crate::conversation::tool_loop::DEFAULT_MAX_TURNS;
use crate::history::Session;
use crate::research::ResearchState;
use crate::research::expand::DEFAULT_QUERY_COUNT;
use crate::research::persist::REPORT_BANNER;
use crate::retrieval::{MAX_CONTENT_LENGTH, MAX_LINKS_PER_SEARCH, MAX_WIKIPEDIA_RESULTS};

#[derive(Parser)]
#[command(name = "deep-search")]
#[command(about = "Research agent: expands a question, searches the web and Wikipedia, and writes a sourced report")]
#[command(version)]
pub struct Cli {
    /// Log level for deep-search's own output (RUST_LOG adds further directives)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Directory for research artifacts
    #[arg(long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Replace the default research-assistant system instruction
    #[arg(long, global = true)]
    pub system_prompt: Option<String>,

    /// Fail on the first rate limit or server error instead of backing off
    #[arg(long, global = true)]
    pub no_retry: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full research pipeline and write a report
    Research(ResearchArgs),

    /// Talk to the model; it may search and read pages on its own
    Chat(ChatArgs),

    /// List saved research sessions
    History,
}

#[derive(Args)]
pub struct ResearchArgs {
    /// Research question
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Number of search queries to generate
    #[arg(long, default_value_t = DEFAULT_QUERY_COUNT)]
    pub queries: usize,

    /// Web links per query
    #[arg(long, default_value_t = MAX_LINKS_PER_SEARCH)]
    pub web_results: usize,

    /// Wikipedia articles per query
    #[arg(long, default_value_t = MAX_WIKIPEDIA_RESULTS)]
    pub wiki_results: usize,

    /// Maximum characters kept per page
    #[arg(long, default_value_t = MAX_CONTENT_LENGTH)]
    pub max_content_length: usize,

    /// Seconds to wait after each query's searches
    #[arg(long, default_value = "2", value_parser = parse_seconds)]
    pub search_delay: Duration,

    /// Seconds to wait after each page extraction
    #[arg(long, default_value = "3", value_parser = parse_seconds)]
    pub extract_delay: Duration,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Send one message and exit instead of starting an interactive session
    #[arg(short, long)]
    pub message: Option<String>,

    /// Model calls allowed per message (0 = unbounded)
    #[arg(long, default_value_t = DEFAULT_MAX_TURNS)]
    pub max_turns: usize,

    /// Maximum characters returned by the page tools
    #[arg(long, default_value_t = MAX_CONTENT_LENGTH)]
    pub max_content_length: usize,
}

impl Cli {
    pub fn research_config(&self, args: &ResearchArgs) -> ResearchConfig {
        ResearchConfig {
            query_count: args.queries,
            web_results: args.web_results,
            wikipedia_results: args.wiki_results,
            max_content_length: args.max_content_length,
            search_delay: args.search_delay,
            extract_delay: args.extract_delay,
            ..self.base_config()
        }
    }

    pub fn chat_config(&self, args: &ChatArgs) -> ResearchConfig {
        ResearchConfig {
            max_content_length: args.max_content_length,
            chat_max_turns: args.max_turns,
            ..self.base_config()
        }
    }

    fn base_config(&self) -> ResearchConfig {
        let defaults = ResearchConfig::default();
        ResearchConfig {
            output_dir: self.output_dir.clone(),
            system_instruction: self
                .system_prompt
                .clone()
                .unwrap_or(defaults.system_instruction.clone()),
            ..defaults
        }
    }
}

impl ResearchArgs {
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("expected a number of seconds, got {raw:?}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid delay {raw:?}: {e}"))
}

/// Queries, sources, report and artifact paths of a finished run.
pub fn render_research(state: &ResearchState) -> String {
    ResearchSummary(state).to_string()
}

pub fn render_sessions(sessions: &[Session]) -> String {
    SessionList(sessions).to_string()
}

struct ResearchSummary<'a>(&'a ResearchState);

impl fmt::Display for ResearchSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        writeln!(f, "Research: {}", state.user_query())?;

        writeln!(f, "\nGenerated queries:")?;
        for (i, query) in state.queries.iter().enumerate() {
            writeln!(f, "  {}. {query}", i + 1)?;
        }

        writeln!(
            f,
            "\nSearch results: {} links across {} queries",
            state.search_results.total_links(),
            state.search_results.len()
        )?;
        for (query, links) in state.search_results.iter() {
            writeln!(f, "  {query} ({})", links.len())?;
            for link in links {
                writeln!(f, "    - {link}")?;
            }
        }

        writeln!(f, "\nSources used: {}", state.extracted_contents.len())?;
        for item in &state.extracted_contents {
            writeln!(f, "  - {}", item.url)?;
        }

        writeln!(f, "\n{REPORT_BANNER}\n")?;
        writeln!(f, "{}\n", state.report.trim_end())?;

        for (label, path) in [("Report", &state.report_path), ("Data", &state.json_path)] {
            match path {
                Some(path) => writeln!(f, "{label} saved to {}", path.display())?,
                None => writeln!(f, "{label} was not saved")?,
            }
        }
        Ok(())
    }
}

struct SessionList<'a>(&'a [Session]);

impl fmt::Display for SessionList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No research history found.");
        }
        for session in self.0 {
            writeln!(f, "{}", session.title())?;
            for report in &session.reports {
                writeln!(f, "  report: {}", report.display())?;
            }
            for data in &session.data {
                writeln!(f, "  data:   {}", data.display())?;
            }
        }
        Ok(())
    }
}
