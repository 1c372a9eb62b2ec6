//! Retrieval records and the adapters that produce them.
//!
//! Adapters return `Result`s; [`WebRetriever`] is the record-level facade that
//! logs failures and degrades them to empty or `success = false` records.

pub mod web;
pub mod wikipedia;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::fetch;
use web::DuckDuckGo;
use wikipedia::Wikipedia;

pub const MAX_LINKS_PER_SEARCH: usize = 5;
pub const MAX_WIKIPEDIA_RESULTS: usize = 3;
pub const MAX_CONTENT_LENGTH: usize = 4000;

/// Desktop browser identity; some sites refuse obvious bots.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentResult {
    pub content: String,
    pub success: bool,
    pub url: String,
}

impl ContentResult {
    pub fn extracted(url: impl Into<String>, content: String) -> Self {
        Self {
            content,
            success: true,
            url: url.into(),
        }
    }

    pub fn failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            success: false,
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQueries {
    pub queries: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed: status {0}")]
    Status(u16),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("page not found: {0}")]
    NotFound(String),
}

/// The retrieval surface shared by the research workflow and the chat tools.
/// None of these fail: errors are folded into the returned record.
pub trait Retriever {
    async fn search_web(&self, query: &str, max_results: usize) -> SearchResult;
    async fn search_wikipedia(&self, query: &str, max_results: usize) -> SearchResult;
    async fn page_content(&self, url: &str, max_length: usize) -> ContentResult;
    async fn wikipedia_page(&self, title: &str, max_length: usize) -> ContentResult;
}

/// Production retriever backed by DuckDuckGo, Wikipedia and direct page fetches.
#[derive(Clone)]
pub struct WebRetriever {
    http: Client,
    web: DuckDuckGo,
    wikipedia: Wikipedia,
}

impl WebRetriever {
    pub fn new(http: Client) -> Self {
        Self {
            web: DuckDuckGo::new(http.clone()),
            wikipedia: Wikipedia::new(http.clone()),
            http,
        }
    }
}

impl Retriever for WebRetriever {
    async fn search_web(&self, query: &str, max_results: usize) -> SearchResult {
        match self.web.search(query, max_results).await {
            Ok(links) => {
                debug!(query, links = links.len(), "web search complete");
                SearchResult { links }
            }
            Err(e) => {
                warn!(query, error = %e, "web search failed");
                SearchResult::default()
            }
        }
    }

    async fn search_wikipedia(&self, query: &str, max_results: usize) -> SearchResult {
        match self.wikipedia.search(query, max_results).await {
            Ok(links) => {
                debug!(query, links = links.len(), "Wikipedia search complete");
                SearchResult { links }
            }
            Err(e) => {
                warn!(query, error = %e, "Wikipedia search failed");
                SearchResult::default()
            }
        }
    }

    async fn page_content(&self, url: &str, max_length: usize) -> ContentResult {
        fetch::page_content(&self.http, url, max_length).await
    }

    async fn wikipedia_page(&self, title: &str, max_length: usize) -> ContentResult {
        match self.wikipedia.page(title).await {
            Ok(page) => {
                let content = with_source_header(
                    &format!("Content from Wikipedia: {}", page.url),
                    &page.content,
                    max_length,
                );
                ContentResult::extracted(page.url, content)
            }
            Err(e) => {
                warn!(title, error = %e, "Wikipedia page lookup failed");
                ContentResult::failed(
                    wikipedia::article_url(title),
                    format!("Error getting Wikipedia page: {e}"),
                )
            }
        }
    }
}

/// `<header>\n\n<body>` with the body cut to `max_length` characters and
/// suffixed with `...` when cut.
pub(crate) fn with_source_header(header: &str, body: &str, max_length: usize) -> String {
    match body.char_indices().nth(max_length) {
        Some((end, _)) => format!("{header}\n\n{}...", &body[..end]),
        None => format!("{header}\n\n{body}"),
    }
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn web_search_failure_degrades_to_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let http = Client::new();
        let retriever = WebRetriever {
            web: DuckDuckGo::with_base_url(http.clone(), &format!("{}/html/", server.uri())),
            wikipedia: Wikipedia::with_api_url(
                http.clone(),
                &format!("{}/w/api.php", server.uri()),
            ),
            http,
        };

        let result = retriever.search_web("anything", 5).await;
        assert!(result.links.is_empty());
    }

    #[tokio::test]
    async fn missing_wikipedia_page_is_unsuccessful_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": {"pages": [{"title": "No Such Thing", "missing": true}]}
            })))
            .mount(&server)
            .await;

        let http = Client::new();
        let retriever = WebRetriever {
            web: DuckDuckGo::with_base_url(http.clone(), &server.uri()),
            wikipedia: Wikipedia::with_api_url(
                http.clone(),
                &format!("{}/w/api.php", server.uri()),
            ),
            http,
        };

        let result = retriever.wikipedia_page("No Such Thing", 100).await;

        assert!(!result.success);
        assert!(result.content.starts_with("Error getting Wikipedia page:"));
        assert_eq!(result.url, "https://en.wikipedia.org/wiki/No_Such_Thing");
    }

    #[tokio::test]
    async fn wikipedia_page_is_annotated_and_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": {"pages": [{
                    "title": "Rust (programming language)",
                    "extract": "a".repeat(30),
                    "fullurl": "https://en.wikipedia.org/wiki/Rust_(programming_language)"
                }]}
            })))
            .mount(&server)
            .await;

        let http = Client::new();
        let retriever = WebRetriever {
            web: DuckDuckGo::with_base_url(http.clone(), &server.uri()),
            wikipedia: Wikipedia::with_api_url(
                http.clone(),
                &format!("{}/w/api.php", server.uri()),
            ),
            http,
        };

        let result = retriever.wikipedia_page("Rust (programming language)", 10).await;

        assert!(result.success);
        assert_eq!(
            result.content,
            format!(
                "Content from Wikipedia: https://en.wikipedia.org/wiki/Rust_(programming_language)\n\n{}...",
                "a".repeat(10)
            )
        );
    }
}
