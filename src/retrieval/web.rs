use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use super::{BROWSER_USER_AGENT, RetrievalError};

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);
/// Worldwide results, moderate safe search.
const REGION: &str = "wt-wt";
const SAFE_SEARCH_MODERATE: &str = "-1";
/// Extra candidates requested so filtering still leaves `max_results` links.
const EXTRA_CANDIDATES: usize = 5;

const EXCLUDED_EXTENSIONS: [&str; 13] = [
    ".pdf", ".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx", ".zip", ".rar", ".jpg", ".png",
    ".gif", ".svg",
];

/// General web search through DuckDuckGo's HTML endpoint.
#[derive(Clone)]
pub struct DuckDuckGo {
    http: Client,
    base_url: String,
}

impl DuckDuckGo {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: SEARCH_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>, RetrievalError> {
        let url = Url::parse_with_params(
            &self.base_url,
            &[("q", query), ("kl", REGION), ("kp", SAFE_SEARCH_MODERATE)],
        )?;

        let response = self
            .http
            .get(url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        let candidates = parse_result_links(&html, max_results + EXTRA_CANDIDATES);
        Ok(filter_links(candidates, max_results))
    }
}

fn parse_result_links(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a.result__a") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(resolve_redirect)
        .take(limit)
        .collect()
}

/// Unwraps `//duckduckgo.com/l/?uddg=<target>` redirects; drops other
/// DuckDuckGo-internal links (ads go through `/y.js`).
fn resolve_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let Ok(parsed) = Url::parse(&absolute) else {
        // Malformed links are passed through and rejected by `filter_links`.
        return Some(absolute);
    };

    let is_ddg = parsed
        .host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"));
    if !is_ddg {
        return Some(absolute);
    }

    if parsed.path() == "/l/" {
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    None
}

/// Drops document/media links and malformed URLs, keeping the first `max_results`.
pub(crate) fn filter_links(
    candidates: impl IntoIterator<Item = String>,
    max_results: usize,
) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|href| !is_document_link(href))
        .filter(|href| has_scheme_and_host(href))
        .take(max_results)
        .collect()
}

fn is_document_link(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    EXCLUDED_EXTENSIONS.iter().any(|ext| lower.contains(ext))
}

fn has_scheme_and_host(href: &str) -> bool {
    Url::parse(href).is_ok_and(|u| {
        !u.scheme().is_empty() && u.host_str().is_some_and(|h| !h.is_empty())
    })
}
