use tracing::{info, warn};

use crate::gemini::LanguageModel;
use crate::retrieval::GeneratedQueries;

pub const DEFAULT_QUERY_COUNT: usize = 5;

/// Asks `model` for `n` search queries covering different facets of `query`.
///
/// Never fails: any model or parse problem yields `[query]`.
pub async fn expand(
    query: &str,
    model: &impl LanguageModel,
    n: usize,
    system_instruction: Option<&str>,
) -> GeneratedQueries {
    let n = n.max(1);
    let fallback = || GeneratedQueries {
        queries: vec![query.to_string()],
    };

    let reply = match model
        .generate_text(&expansion_prompt(query, n), system_instruction)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "query generation failed, using original query");
            return fallback();
        }
    };

    match parse_queries(&reply) {
        Some(mut queries) if !queries.is_empty() => {
            queries.truncate(n);
            info!(count = queries.len(), "generated search queries");
            GeneratedQueries { queries }
        }
        Some(_) => {
            warn!("model returned no queries, using original query");
            fallback()
        }
        None => {
            warn!(reply = %reply.trim(), "model reply was not a JSON list of strings");
            fallback()
        }
    }
}

fn expansion_prompt(query: &str, n: usize) -> String {
    format!(
        r#"Given the user's query: "{query}"
Generate a list of {n} specific and diverse search engine queries that, researched individually,
would together give a comprehensive and well-structured explanation of the original query.
Cover different facets such as definitions, core concepts, examples, benefits, drawbacks,
applications, or related topics.

Output ONLY a valid JSON list of strings. Do not include any other text.
Example format:
["query about definition", "query about applications", "query about examples"]"#
    )
}

fn parse_queries(reply: &str) -> Option<Vec<String>> {
    serde_json::from_str::<Vec<String>>(strip_code_fence(reply)).ok()
}

/// Removes a leading ```` ```json ```` or ```` ``` ```` fence and a trailing ```` ``` ````.
fn strip_code_fence(reply: &str) -> &str {
    let text = reply.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}
