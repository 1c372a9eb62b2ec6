use std::time::Duration;

use percent_encoding::percent_decode_str;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::RetrievalError;

const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const ARTICLE_BASE: &str = "https://en.wikipedia.org/wiki/";
const ARTICLE_MARKER: &str = "wikipedia.org/wiki/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Encyclopedia search and article text through the MediaWiki API.
#[derive(Clone)]
pub struct Wikipedia {
    http: Client,
    api_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    pub title: String,
    pub content: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    query: Option<QueryBody>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    search: Vec<SearchHit>,
    #[serde(default)]
    pages: Vec<PageBody>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    extract: Option<String>,
    fullurl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    info: Option<String>,
}

impl Wikipedia {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            api_url: API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_api_url(http: Client, api_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.to_string(),
        }
    }

    /// Searches article titles and returns canonical article URLs.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>, RetrievalError> {
        let limit = max_results.to_string();
        let body = self
            .call(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", &limit),
                ("srprop", ""),
            ])
            .await?;

        Ok(body
            .search
            .into_iter()
            .take(max_results)
            .map(|hit| article_url(&hit.title))
            .collect())
    }

    /// Fetches the plain-text body of an article, following redirects.
    pub async fn page(&self, title: &str) -> Result<WikiPage, RetrievalError> {
        let body = self
            .call(&[
                ("action", "query"),
                ("prop", "extracts|info"),
                ("explaintext", "1"),
                ("inprop", "url"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;

        let page = body
            .pages
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::NotFound(title.to_string()))?;

        if page.missing || page.invalid {
            return Err(RetrievalError::NotFound(page.title));
        }

        let content = page.extract.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(RetrievalError::NotFound(page.title));
        }

        let url = page.fullurl.unwrap_or_else(|| article_url(&page.title));
        Ok(WikiPage {
            title: page.title,
            content,
            url,
        })
    }

    async fn call(&self, params: &[(&str, &str)]) -> Result<QueryBody, RetrievalError> {
        let mut url = Url::parse(&self.api_url)?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("format", "json")
            .append_pair("formatversion", "2");

        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let body: ApiResponse =
            serde_json::from_str(&text).map_err(|e| RetrievalError::Parse(e.to_string()))?;

        if let Some(err) = body.error {
            let code = err.code.unwrap_or_else(|| "unknown".to_string());
            let info = err.info.unwrap_or_default();
            return Err(RetrievalError::Api(format!("{code}: {info}")));
        }

        body.query
            .ok_or_else(|| RetrievalError::Parse("response has no query body".to_string()))
    }
}

pub fn article_url(title: &str) -> String {
    format!("{ARTICLE_BASE}{}", title.replace(' ', "_"))
}

pub fn is_article_url(url: &str) -> bool {
    url.contains(ARTICLE_MARKER)
}

/// Recovers the article title from a `.../wiki/<Title>` URL.
pub fn title_from_url(url: &str) -> Option<String> {
    if !is_article_url(url) {
        return None;
    }
    let raw = url.rsplit("/wiki/").next()?;
    let raw = raw.split(['#', '?']).next().unwrap_or(raw);
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let title = decoded.replace('_', " ");
    if title.trim().is_empty() {
        None
    } else {
        Some(title)
    }
}
