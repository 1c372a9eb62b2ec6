use std::path::PathBuf;
use std::time::Duration;

use crate::conversation::tool_loop::DEFAULT_MAX_TURNS;
use crate::research::expand::DEFAULT_QUERY_COUNT;
use crate::retrieval::{MAX_CONTENT_LENGTH, MAX_LINKS_PER_SEARCH, MAX_WIKIPEDIA_RESULTS};

pub const DEFAULT_OUTPUT_DIR: &str = "research_outputs";
pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_EXTRACT_DELAY: Duration = Duration::from_secs(3);

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a research assistant that helps users by \
finding and synthesizing information from the web. You have access to search tools to gather \
information on different topics. Use these tools to provide comprehensive, accurate and \
well-sourced information. When using multiple tools, make sure to integrate the information \
logically. Always cite your sources when providing information.";

/// Run-time knobs for research and chat.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    pub query_count: usize,
    pub web_results: usize,
    pub wikipedia_results: usize,
    pub max_content_length: usize,
    /// Pause after each query's searches.
    pub search_delay: Duration,
    /// Pause after each page extraction.
    pub extract_delay: Duration,
    pub output_dir: PathBuf,
    /// `0` means unbounded.
    pub chat_max_turns: usize,
    pub system_instruction: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            query_count: DEFAULT_QUERY_COUNT,
            web_results: MAX_LINKS_PER_SEARCH,
            wikipedia_results: MAX_WIKIPEDIA_RESULTS,
            max_content_length: MAX_CONTENT_LENGTH,
            search_delay: DEFAULT_SEARCH_DELAY,
            extract_delay: DEFAULT_EXTRACT_DELAY,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            chat_max_turns: DEFAULT_MAX_TURNS,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

#[cfg(test)]
impl ResearchConfig {
    /// No pacing.
    pub fn without_delays(mut self) -> Self {
        self.search_delay = Duration::ZERO;
        self.extract_delay = Duration::ZERO;
        self
    }
}
