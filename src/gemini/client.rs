use std::env;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, warn};

use super::convert::{reply_turn, to_wire_request};
use super::retry::RetryPolicy;
use super::types::{ApiError, GenerateContentRequest, GenerateContentResponse};
use crate::conversation::{ToolDeclaration, Turn};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("response blocked: {0}")]
    Blocked(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Everything one `generateContent` call needs: history, tools, system prompt.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub contents: &'a [Turn],
    pub tools: &'a [ToolDeclaration],
    pub system_instruction: Option<&'a str>,
}

impl<'a> ModelRequest<'a> {
    pub fn new(contents: &'a [Turn]) -> Self {
        Self {
            contents,
            tools: &[],
            system_instruction: None,
        }
    }

    pub fn with_tools(mut self, tools: &'a [ToolDeclaration]) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_system_instruction(mut self, instruction: Option<&'a str>) -> Self {
        self.system_instruction = instruction;
        self
    }
}

/// Abstraction over a generative model.
/// Implemented by `GeminiClient` for production; mock implementations used in tests.
pub trait LanguageModel {
    async fn generate(&self, request: &ModelRequest<'_>) -> Result<Turn, GeminiError>;

    /// Single-prompt convenience: returns the concatenated text of the reply.
    async fn generate_text(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, GeminiError> {
        let contents = [Turn::user(prompt)];
        let request = ModelRequest::new(&contents).with_system_instruction(system_instruction);
        let text = self.generate(&request).await?.joined_text();
        if text.is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Builds a client from `GEMINI_API_KEY`, with the model taken from `model_var`
    /// (falling back to [`DEFAULT_MODEL`]).
    pub fn from_env(http: Client, model_var: &str) -> Result<Self, GeminiError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| GeminiError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(GeminiError::ApiKeyNotSet);
        }
        let model = env::var(model_var)
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model,
            base_url: API_BASE.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate_once(
        &self,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API rate limited");
            return Err(GeminiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<GenerateContentResponse>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(err);
                warn!(error = %classified, "Gemini API error");
                return Err(classified);
            }
            let end = text.floor_char_boundary(200);
            warn!(status = %status, "Gemini API error (no structured body)");
            return Err(GeminiError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..end]),
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        debug!(model = %self.model, "gemini call complete");

        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Gemini API error in 200 response");
            return Err(classified);
        }

        Ok(body)
    }
}

impl LanguageModel for GeminiClient {
    async fn generate(&self, request: &ModelRequest<'_>) -> Result<Turn, GeminiError> {
        let body = to_wire_request(request);
        let started = Instant::now();
        let mut attempt = 0;
        loop {
            match self.generate_once(&body).await {
                Ok(response) => return reply_turn(response),
                Err(e) if is_retriable(&e) => {
                    let delay = self.retry.delay(attempt);
                    if !self.retry.allows(started.elapsed(), delay) {
                        return Err(e);
                    }
                    attempt += 1;
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_retriable(e: &GeminiError) -> bool {
    matches!(
        e,
        GeminiError::RateLimited
            | GeminiError::Api {
                code: 500..=599,
                ..
            }
    )
}

fn classify_api_error(err: &ApiError) -> GeminiError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => GeminiError::RateLimited,
        Some(403) => GeminiError::QuotaExhausted(message),
        Some(code) => GeminiError::Api { code, message },
        None => GeminiError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}
