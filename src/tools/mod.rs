//! The retrieval tools a model may call during chat.

mod errors;
mod params;

pub use errors::ToolError;
pub(crate) use errors::failure_response;
use params::{PageParams, SearchParams, WikipediaPageParams};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::info;

use crate::conversation::ToolDeclaration;
use crate::retrieval::{
    MAX_CONTENT_LENGTH, MAX_LINKS_PER_SEARCH, MAX_WIKIPEDIA_RESULTS, Retriever,
};
use crate::retrieval::wikipedia;

pub const SEARCH_WEB: &str = "search_web";
pub const GET_PAGE_CONTENT: &str = "get_page_content";
pub const SEARCH_WIKIPEDIA: &str = "search_wikipedia";
pub const GET_WIKIPEDIA_PAGE: &str = "get_wikipedia_page";

const MAX_RESULTS_CEILING: usize = 10;

/// A set of named tools with JSON-schema declarations.
pub trait ToolBox {
    fn declarations(&self) -> &[ToolDeclaration];

    /// Runs tool `name`. The returned value is sent back to the model verbatim.
    async fn invoke(&self, name: &str, args: &Value) -> Result<Value, ToolError>;
}

/// Web search, page reading and Wikipedia lookup over a [`Retriever`].
pub struct ResearchTools<'a, R> {
    retriever: &'a R,
    declarations: Vec<ToolDeclaration>,
    max_content_length: usize,
}

impl<'a, R: Retriever> ResearchTools<'a, R> {
    pub fn new(retriever: &'a R) -> Self {
        Self {
            retriever,
            declarations: declarations(),
            max_content_length: MAX_CONTENT_LENGTH,
        }
    }

    pub fn with_max_content_length(mut self, max_content_length: usize) -> Self {
        self.max_content_length = max_content_length;
        self
    }
}

impl<R: Retriever> ToolBox for ResearchTools<'_, R> {
    fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    async fn invoke(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        match name {
            SEARCH_WEB => {
                let params: SearchParams = parse_args(name, args)?;
                let max = clamp_results(params.max_results, MAX_LINKS_PER_SEARCH);
                info!(query = %params.query, max, "tool:search_web");
                encode(&self.retriever.search_web(&params.query, max).await)
            }
            GET_PAGE_CONTENT => {
                let params: PageParams = parse_args(name, args)?;
                let max_length = params.max_length.unwrap_or(self.max_content_length);
                info!(url = %params.url, "tool:get_page_content");
                encode(&self.retriever.page_content(&params.url, max_length).await)
            }
            SEARCH_WIKIPEDIA => {
                let params: SearchParams = parse_args(name, args)?;
                let max = clamp_results(params.max_results, MAX_WIKIPEDIA_RESULTS);
                info!(query = %params.query, max, "tool:search_wikipedia");
                encode(&self.retriever.search_wikipedia(&params.query, max).await)
            }
            GET_WIKIPEDIA_PAGE => {
                let params: WikipediaPageParams = parse_args(name, args)?;
                let title = wikipedia::title_from_url(&params.title).unwrap_or(params.title);
                info!(title = %title, "tool:get_wikipedia_page");
                encode(
                    &self
                        .retriever
                        .wikipedia_page(&title, self.max_content_length)
                        .await,
                )
            }
            other => Err(ToolError::Unknown(other.to_string())),
        }
    }
}

fn declarations() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration {
            name: SEARCH_WEB.to_string(),
            description: "Search the web with DuckDuckGo and return links to relevant pages."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query"},
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of links to return (1-10, default 5)"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDeclaration {
            name: GET_PAGE_CONTENT.to_string(),
            description: "Fetch a web page and extract its main readable text.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "The URL to fetch content from"},
                    "max_length": {
                        "type": "integer",
                        "description": "Maximum number of characters of content to return"
                    }
                },
                "required": ["url"]
            }),
        },
        ToolDeclaration {
            name: SEARCH_WIKIPEDIA.to_string(),
            description: "Search Wikipedia and return links to relevant articles.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query"},
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of articles to return (1-10, default 3)"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDeclaration {
            name: GET_WIKIPEDIA_PAGE.to_string(),
            description: "Get the plain-text content of a Wikipedia article.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "The title of the Wikipedia page"}
                },
                "required": ["title"]
            }),
        },
    ]
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: &Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        json!({})
    } else {
        args.clone()
    };
    serde_json::from_value(args).map_err(|source| ToolError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

fn encode(record: &impl Serialize) -> Result<Value, ToolError> {
    serde_json::to_value(record).map_err(ToolError::Encode)
}

fn clamp_results(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_RESULTS_CEILING)
}
