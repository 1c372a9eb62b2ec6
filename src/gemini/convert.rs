use tracing::warn;

use super::client::{GeminiError, ModelRequest};
use super::types::{self as wire, GenerateContentRequest, GenerateContentResponse};
use crate::conversation::{FunctionCall, FunctionResponse, Part, Role, Turn};

pub(super) fn to_wire_request<'a>(request: &ModelRequest<'a>) -> GenerateContentRequest<'a> {
    let tools = if request.tools.is_empty() {
        Vec::new()
    } else {
        vec![wire::Tool {
            function_declarations: request.tools,
        }]
    };

    GenerateContentRequest {
        // The API rejects contents without parts.
        contents: request
            .contents
            .iter()
            .filter(|turn| !turn.parts.is_empty())
            .map(to_wire_content)
            .collect(),
        tools,
        system_instruction: request.system_instruction.map(|text| wire::Content {
            parts: vec![wire::Part {
                text: Some(text.to_string()),
                ..Default::default()
            }],
            role: None,
        }),
    }
}

fn to_wire_content(turn: &Turn) -> wire::Content {
    // The API only knows "user" and "model"; tool results travel as user content.
    let role = match turn.role {
        Role::User | Role::Tool => "user",
        Role::Model => "model",
    };
    wire::Content {
        parts: turn.parts.iter().map(to_wire_part).collect(),
        role: Some(role.to_string()),
    }
}

fn to_wire_part(part: &Part) -> wire::Part {
    match part {
        Part::Text(text) => wire::Part {
            text: Some(text.clone()),
            ..Default::default()
        },
        Part::FunctionCall(call) => wire::Part {
            function_call: Some(wire::FunctionCall {
                name: call.name.clone(),
                args: call.args.clone(),
            }),
            thought_signature: call.thought_signature.clone(),
            ..Default::default()
        },
        Part::FunctionResponse(response) => wire::Part {
            function_response: Some(wire::FunctionResponse {
                name: response.name.clone(),
                response: response.response.clone(),
            }),
            ..Default::default()
        },
    }
}

/// Converts the first candidate of a response into a model turn.
pub(super) fn reply_turn(response: GenerateContentResponse) -> Result<Turn, GeminiError> {
    let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);
    let candidate = response.candidates.and_then(|c| c.into_iter().next());

    let Some(candidate) = candidate else {
        return Err(match block_reason {
            Some(reason) => GeminiError::Blocked(reason),
            None => GeminiError::EmptyResponse,
        });
    };

    let parts: Vec<Part> = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(from_wire_part)
        .collect();

    if parts.is_empty() {
        warn!(
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
            "Gemini returned a candidate without usable parts"
        );
        if let Some(reason) = candidate.finish_reason
            && (reason == "SAFETY" || reason == "BLOCKLIST")
        {
            return Err(GeminiError::Blocked(reason));
        }
    }

    Ok(Turn {
        role: Role::Model,
        parts,
    })
}

fn from_wire_part(part: wire::Part) -> Option<Part> {
    if let Some(call) = part.function_call {
        return Some(Part::FunctionCall(FunctionCall {
            name: call.name,
            args: call.args,
            thought_signature: part.thought_signature,
        }));
    }
    if let Some(response) = part.function_response {
        return Some(Part::FunctionResponse(FunctionResponse {
            name: response.name,
            response: response.response,
        }));
    }
    part.text.filter(|t| !t.is_empty()).map(Part::Text)
}
