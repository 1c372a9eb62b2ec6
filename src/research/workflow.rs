use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use super::expand::expand;
use super::persist;
use super::prompt::{build_context, report_prompt};
use super::state::{ExtractedContent, ResearchState};
use crate::config::ResearchConfig;
use crate::gemini::LanguageModel;
use crate::retrieval::{Retriever, wikipedia};

pub const NO_CONTENT_REPORT: &str =
    "Error: No content was successfully extracted from web searches to generate a report.";

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("research query must not be empty")]
    EmptyQuery,
}

/// Pipeline position. Stages run strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExpandQueries,
    RunSearches,
    ExtractContents,
    SynthesizeReport,
    Persist,
    Done,
}

impl Stage {
    pub fn next(self) -> Self {
        match self {
            Self::ExpandQueries => Self::RunSearches,
            Self::RunSearches => Self::ExtractContents,
            Self::ExtractContents => Self::SynthesizeReport,
            Self::SynthesizeReport => Self::Persist,
            Self::Persist | Self::Done => Self::Done,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ExpandQueries => "expand_queries",
            Self::RunSearches => "run_searches",
            Self::ExtractContents => "extract_contents",
            Self::SynthesizeReport => "synthesize_report",
            Self::Persist => "persist",
            Self::Done => "done",
        }
    }

    /// Share of the pipeline finished when this stage starts.
    pub fn progress(self) -> f32 {
        let index = match self {
            Self::ExpandQueries => 0,
            Self::RunSearches => 1,
            Self::ExtractContents => 2,
            Self::SynthesizeReport => 3,
            Self::Persist => 4,
            Self::Done => 5,
        };
        index as f32 / 5.0
    }
}

/// Observer for stage transitions.
pub type ProgressFn<'a> = &'a (dyn Fn(Stage, f32) + Sync);

/// Runs the expand → search → extract → synthesize → persist pipeline.
pub struct Researcher<'a, M, R> {
    model: &'a M,
    report_model: &'a M,
    retriever: &'a R,
    config: &'a ResearchConfig,
    progress: Option<ProgressFn<'a>>,
}

impl<'a, M: LanguageModel, R: Retriever> Researcher<'a, M, R> {
    pub fn new(
        model: &'a M,
        report_model: &'a M,
        retriever: &'a R,
        config: &'a ResearchConfig,
    ) -> Self {
        Self {
            model,
            report_model,
            retriever,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn research(&self, query: &str) -> Result<ResearchState, ResearchError> {
        if query.trim().is_empty() {
            return Err(ResearchError::EmptyQuery);
        }

        let mut state = ResearchState::new(query);
        let mut stage = Stage::ExpandQueries;
        loop {
            info!(stage = stage.name(), "research stage");
            if let Some(progress) = self.progress {
                progress(stage, stage.progress());
            }
            match stage {
                Stage::ExpandQueries => self.expand_queries(&mut state).await,
                Stage::RunSearches => self.run_searches(&mut state).await,
                Stage::ExtractContents => self.extract_contents(&mut state).await,
                Stage::SynthesizeReport => self.synthesize_report(&mut state).await,
                Stage::Persist => self.persist(&mut state).await,
                Stage::Done => break,
            }
            stage = stage.next();
        }
        Ok(state)
    }

    pub async fn expand_queries(&self, state: &mut ResearchState) {
        info!(query = %state.user_query(), "generating search queries");
        let generated = expand(
            state.user_query(),
            self.model,
            self.config.query_count,
            Some(&self.config.system_instruction),
        )
        .await;
        state.queries = generated.queries;
    }

    /// Web then Wikipedia links per query, first occurrence kept.
    pub async fn run_searches(&self, state: &mut ResearchState) {
        for query in &state.queries {
            info!(query = %query, "searching");
            let web = self
                .retriever
                .search_web(query, self.config.web_results)
                .await;
            let wiki = self
                .retriever
                .search_wikipedia(query, self.config.wikipedia_results)
                .await;

            let links = dedup_links(web.links.into_iter().chain(wiki.links));
            if links.is_empty() {
                warn!(query = %query, "no links found");
            } else {
                info!(query = %query, links = links.len(), "links found");
            }
            state.search_results.insert(query.as_str(), links);

            pace(self.config.search_delay).await;
        }
    }

    /// Keeps only successful extractions, in `(query, link)` order.
    pub async fn extract_contents(&self, state: &mut ResearchState) {
        state.extracted_contents.clear();
        let max_length = self.config.max_content_length;

        for (query, links) in state.search_results.iter() {
            for link in links {
                info!(url = %link, "extracting content");
                let result = match wikipedia::title_from_url(link) {
                    Some(title) => self.retriever.wikipedia_page(&title, max_length).await,
                    None => self.retriever.page_content(link, max_length).await,
                };

                if result.success {
                    state.extracted_contents.push(ExtractedContent {
                        query: query.to_string(),
                        url: link.clone(),
                        content: result.content,
                    });
                } else {
                    warn!(url = %link, reason = %result.content, "extraction failed");
                }

                pace(self.config.extract_delay).await;
            }
        }
        info!(
            extracted = state.extracted_contents.len(),
            "content extraction finished"
        );
    }

    pub async fn synthesize_report(&self, state: &mut ResearchState) {
        if state.extracted_contents.is_empty() {
            warn!("no content extracted, skipping report generation");
            state.report = NO_CONTENT_REPORT.to_string();
            return;
        }

        let context = build_context(&state.extracted_contents);
        let prompt = report_prompt(state.user_query(), &context);
        state.report = match self
            .report_model
            .generate_text(&prompt, Some(&self.config.system_instruction))
            .await
        {
            Ok(report) => {
                info!(chars = report.chars().count(), "report generated");
                report
            }
            Err(e) => {
                warn!(error = %e, "report generation failed");
                format!("Error generating report: {e}")
            }
        };
    }

    pub async fn persist(&self, state: &mut ResearchState) {
        let base = persist::base_name(state.user_query(), &Local::now());
        let artifacts = persist::save(&self.config.output_dir, state, &base).await;
        state.json_path = artifacts.json_path;
        state.report_path = artifacts.report_path;
    }
}

fn dedup_links(links: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for link in links {
        if !unique.contains(&link) {
            unique.push(link);
        }
    }
    unique
}

async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;
    use crate::conversation::Turn;
    use crate::gemini::{GeminiError, ModelRequest};
    use crate::retrieval::{ContentResult, SearchResult};

    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, GeminiError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<&str, GeminiError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl LanguageModel for ScriptedModel {
        async fn generate(&self, request: &ModelRequest<'_>) -> Result<Turn, GeminiError> {
            let prompt = request
                .contents
                .first()
                .map(Turn::joined_text)
                .unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GeminiError::EmptyResponse))
                .map(Turn::model_text)
        }
    }

    /// Deterministic retriever: fixed links per query, pages succeed unless
    /// their URL contains "broken".
    #[derive(Default)]
    struct StubRetriever {
        web: HashMap<String, Vec<String>>,
        wiki: HashMap<String, Vec<String>>,
        fetched: Mutex<Vec<String>>,
    }

    impl StubRetriever {
        fn with_web(mut self, query: &str, links: &[&str]) -> Self {
            self.web
                .insert(query.into(), links.iter().map(|s| s.to_string()).collect());
            self
        }

        fn with_wiki(mut self, query: &str, links: &[&str]) -> Self {
            self.wiki
                .insert(query.into(), links.iter().map(|s| s.to_string()).collect());
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    impl Retriever for StubRetriever {
        async fn search_web(&self, query: &str, _max_results: usize) -> SearchResult {
            SearchResult {
                links: self.web.get(query).cloned().unwrap_or_default(),
            }
        }

        async fn search_wikipedia(&self, query: &str, _max_results: usize) -> SearchResult {
            SearchResult {
                links: self.wiki.get(query).cloned().unwrap_or_default(),
            }
        }

        async fn page_content(&self, url: &str, _max_length: usize) -> ContentResult {
            self.fetched.lock().unwrap().push(format!("page:{url}"));
            if url.contains("broken") {
                ContentResult::failed(url, "Timeout error when fetching the page.")
            } else {
                ContentResult::extracted(url, format!("Content from: {url}\n\nbody"))
            }
        }

        async fn wikipedia_page(&self, title: &str, _max_length: usize) -> ContentResult {
            self.fetched.lock().unwrap().push(format!("wiki:{title}"));
            ContentResult::extracted(
                wikipedia::article_url(title),
                format!("Content from Wikipedia: {title}\n\nbody"),
            )
        }
    }

    fn config(dir: &std::path::Path) -> ResearchConfig {
        ResearchConfig {
            output_dir: dir.to_path_buf(),
            ..ResearchConfig::default().without_delays()
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let links = dedup_links(
            ["a", "b", "a", "c", "b"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(links, ["a", "b", "c"]);
    }

    #[test]
    fn stages_advance_linearly() {
        let mut stage = Stage::ExpandQueries;
        let mut names = vec![stage.name()];
        while stage != Stage::Done {
            stage = stage.next();
            names.push(stage.name());
        }
        assert_eq!(
            names,
            [
                "expand_queries",
                "run_searches",
                "extract_contents",
                "synthesize_report",
                "persist",
                "done"
            ]
        );
        assert_eq!(Stage::Done.next(), Stage::Done);
    }

    #[tokio::test]
    async fn searches_merge_web_then_wikipedia_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let model = ScriptedModel::new(vec![]);
        let retriever = StubRetriever::default()
            .with_web("q1", &["https://a.com", "https://b.com"])
            .with_wiki("q1", &["https://en.wikipedia.org/wiki/A", "https://a.com"])
            .with_web("q2", &["https://c.com"]);
        let researcher = Researcher::new(&model, &model, &retriever, &config);

        let mut state = ResearchState::new("topic");
        state.queries = vec!["q1".into(), "q2".into()];
        researcher.run_searches(&mut state).await;

        assert_eq!(
            state.search_results.get("q1").unwrap(),
            ["https://a.com", "https://b.com", "https://en.wikipedia.org/wiki/A"]
        );
        assert_eq!(state.search_results.get("q2").unwrap(), ["https://c.com"]);
    }

    #[tokio::test]
    async fn run_searches_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let model = ScriptedModel::new(vec![]);
        let retriever = StubRetriever::default()
            .with_web("q1", &["https://a.com"])
            .with_wiki("q2", &["https://en.wikipedia.org/wiki/B"]);
        let researcher = Researcher::new(&model, &model, &retriever, &config);

        let mut state = ResearchState::new("topic");
        state.queries = vec!["q1".into(), "q2".into()];
        researcher.run_searches(&mut state).await;
        let first = state.search_results.clone();
        researcher.run_searches(&mut state).await;

        assert_eq!(state.search_results, first);
    }

    #[tokio::test]
    async fn extraction_routes_wikipedia_links_and_drops_failures() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let model = ScriptedModel::new(vec![]);
        let retriever = StubRetriever::default();
        let researcher = Researcher::new(&model, &model, &retriever, &config);

        let mut state = ResearchState::new("topic");
        state.search_results.insert(
            "q1",
            vec![
                "https://a.com".into(),
                "https://broken.com".into(),
                "https://en.wikipedia.org/wiki/Rust_(programming_language)".into(),
            ],
        );
        state.search_results.insert("q2", vec!["https://b.com".into()]);
        researcher.extract_contents(&mut state).await;

        assert_eq!(
            retriever.fetched(),
            [
                "page:https://a.com",
                "page:https://broken.com",
                "wiki:Rust (programming language)",
                "page:https://b.com"
            ]
        );
        let urls: Vec<_> = state
            .extracted_contents
            .iter()
            .map(|c| (c.query.as_str(), c.url.as_str()))
            .collect();
        assert_eq!(
            urls,
            [
                ("q1", "https://a.com"),
                ("q1", "https://en.wikipedia.org/wiki/Rust_(programming_language)"),
                ("q2", "https://b.com")
            ]
        );
    }

    #[tokio::test]
    async fn empty_extraction_short_circuits_without_model_call() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let model = ScriptedModel::new(vec![Ok("should not be used")]);
        let retriever = StubRetriever::default();
        let researcher = Researcher::new(&model, &model, &retriever, &config);

        let mut state = ResearchState::new("topic");
        researcher.synthesize_report(&mut state).await;

        assert_eq!(state.report, NO_CONTENT_REPORT);
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn report_model_failure_is_recorded_as_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let model = ScriptedModel::new(vec![Err(GeminiError::RateLimited)]);
        let retriever = StubRetriever::default();
        let researcher = Researcher::new(&model, &model, &retriever, &config);

        let mut state = ResearchState::new("topic");
        state.extracted_contents.push(ExtractedContent {
            query: "q".into(),
            url: "https://a.com".into(),
            content: "text".into(),
        });
        researcher.synthesize_report(&mut state).await;

        assert!(
            state.report.starts_with("Error generating report: "),
            "got: {}",
            state.report
        );
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let model = ScriptedModel::new(vec![]);
        let retriever = StubRetriever::default();
        let researcher = Researcher::new(&model, &model, &retriever, &config);

        let result = researcher.research("   ").await;

        assert!(matches!(result, Err(ResearchError::EmptyQuery)));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn query_is_kept_as_typed() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let model = ScriptedModel::new(vec![Ok(r#"["rust"]"#)]);
        let retriever = StubRetriever::default();
        let researcher = Researcher::new(&model, &model, &retriever, &config);

        let state = researcher.research("  What is Rust? ").await.unwrap();

        assert_eq!(state.user_query(), "  What is Rust? ");
        assert_eq!(state.report, NO_CONTENT_REPORT);
        let json = std::fs::read_to_string(state.json_path.unwrap()).unwrap();
        assert!(json.contains(r#""initial_query": "  What is Rust? ""#), "got: {json}");
    }

    #[tokio::test]
    async fn full_pipeline_writes_report_from_extracted_context() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let query_model = ScriptedModel::new(vec![Ok(r#"["rust memory", "rust borrow"]"#)]);
        let report_model = ScriptedModel::new(vec![Ok("# Rust\n\nOwnership explained.")]);
        let retriever = StubRetriever::default()
            .with_web("rust memory", &["https://a.com", "https://broken.com"])
            .with_wiki("rust borrow", &["https://en.wikipedia.org/wiki/Borrow_checker"]);

        let stages = Mutex::new(Vec::new());
        let observe = |stage: Stage, fraction: f32| {
            stages.lock().unwrap().push((stage, fraction));
        };
        let researcher = Researcher::new(&query_model, &report_model, &retriever, &config)
            .with_progress(&observe);

        let state = researcher.research("How does Rust manage memory?").await.unwrap();

        assert_eq!(state.user_query(), "How does Rust manage memory?");
        assert_eq!(state.queries, ["rust memory", "rust borrow"]);
        assert_eq!(state.extracted_contents.len(), 2);
        assert_eq!(state.report, "# Rust\n\nOwnership explained.");

        let report_prompt = &report_model.prompts()[0];
        assert!(report_prompt.contains("Source: https://a.com\nGenerated Query: rust memory"));
        assert!(report_prompt.contains(
            "Source: https://en.wikipedia.org/wiki/Borrow_checker\nGenerated Query: rust borrow"
        ));
        assert!(!report_prompt.contains("broken.com"));

        let report_path = state.report_path.unwrap();
        assert!(report_path.starts_with(dir.path()));
        let name = report_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("how_does_rust_manage_memory_"));
        assert!(name.ends_with("_report.txt"));
        assert!(state.json_path.unwrap().exists());

        let observed = stages.into_inner().unwrap();
        assert_eq!(observed.first(), Some(&(Stage::ExpandQueries, 0.0)));
        assert_eq!(observed.last(), Some(&(Stage::Done, 1.0)));
        assert_eq!(observed.len(), 6);
    }
}
