mod extractor;

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::retrieval::{BROWSER_USER_AGENT, ContentResult, with_source_header};

const MAX_RESPONSE_BYTES: usize = 10_000_000;
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Why a page yielded no text. `Display` is the message stored in the
/// failed `ContentResult`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Timeout error when fetching the page.")]
    Timeout,

    #[error("Cannot extract content: not HTML (content-type: {0})")]
    NotHtml(String),

    #[error("Error fetching the page: status {0}")]
    Status(u16),

    #[error("Error fetching the page: {0}")]
    Http(reqwest::Error),

    #[error("Error fetching the page: response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge,

    #[error("No significant content found on the page.")]
    NoContent,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

/// Fetches `url` and returns its readable text, never failing.
pub async fn page_content(client: &Client, url: &str, max_length: usize) -> ContentResult {
    match fetch_text(client, url, max_length, FETCH_TIMEOUT).await {
        Ok(content) => ContentResult::extracted(url, content),
        Err(e) => {
            warn!(url, error = %e, "page extraction failed");
            ContentResult::failed(url, e.to_string())
        }
    }
}

async fn fetch_text(
    client: &Client,
    url: &str,
    max_length: usize,
    timeout: Duration,
) -> Result<String, FetchError> {
    let html = download(client, url, timeout).await?;
    let text = extractor::extract_text(&html).ok_or(FetchError::NoContent)?;

    debug!(url, bytes = html.len(), chars = text.chars().count(), "page extracted");
    Ok(with_source_header(
        &format!("Content from: {url}"),
        &text,
        max_length,
    ))
}

async fn download(client: &Client, url: &str, timeout: Duration) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .header("User-Agent", BROWSER_USER_AGENT)
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !content_type.contains("html") {
        return Err(FetchError::NotHtml(content_type));
    }

    if let Some(len) = response.content_length()
        && len as usize > MAX_RESPONSE_BYTES
    {
        return Err(FetchError::TooLarge);
    }

    let mut body = Vec::new();
    let mut stream = response;
    while let Some(chunk) = stream.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(FetchError::TooLarge);
        }
    }

    Ok(decode_body(&body, &content_type))
}

/// Decodes with the `charset=` named in the content type, else UTF-8.
fn decode_body(body: &[u8], content_type: &str) -> String {
    let encoding = content_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("charset="))
        .find_map(|label| Encoding::for_label(label.trim_matches('"').as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_declared_latin1_charset() {
        let body = b"caf\xe9";
        assert_eq!(decode_body(body, "text/html; charset=iso-8859-1"), "café");
    }

    #[test]
    fn defaults_to_utf8_with_replacement() {
        assert_eq!(decode_body("café".as_bytes(), "text/html"), "café");
        assert_eq!(decode_body(b"ab\xff", "text/html"), "ab\u{fffd}");
    }

    #[test]
    fn failure_messages_match_record_text() {
        assert_eq!(
            FetchError::Timeout.to_string(),
            "Timeout error when fetching the page."
        );
        assert_eq!(
            FetchError::NoContent.to_string(),
            "No significant content found on the page."
        );
        assert_eq!(
            FetchError::TooLarge.to_string(),
            "Error fetching the page: response too large (>10000000 bytes)"
        );
    }
}
