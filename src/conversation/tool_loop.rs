use tracing::{debug, info, warn};

use super::{ConversationState, FunctionCall, FunctionResponse, Part, Turn};
use crate::gemini::{LanguageModel, ModelRequest};
use crate::tools::{ToolBox, failure_response};

pub const DEFAULT_MAX_TURNS: usize = 10;
const NO_RESPONSE: &str = "No response generated.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error("model kept calling tools after {max_turns} turns")]
    TurnLimit { max_turns: usize },
}

/// Alternates model calls and tool invocations until the model answers in
/// plain text.
pub struct ToolLoop<'a, M, T> {
    model: &'a M,
    tools: &'a T,
    system_instruction: Option<&'a str>,
    max_turns: Option<usize>,
}

impl<'a, M: LanguageModel, T: ToolBox> ToolLoop<'a, M, T> {
    pub fn new(model: &'a M, tools: &'a T) -> Self {
        Self {
            model,
            tools,
            system_instruction: None,
            max_turns: Some(DEFAULT_MAX_TURNS),
        }
    }

    pub fn with_system_instruction(mut self, instruction: &'a str) -> Self {
        self.system_instruction = Some(instruction);
        self
    }

    /// `0` removes the bound.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = (max_turns > 0).then_some(max_turns);
        self
    }

    /// Appends `message`, runs the loop and returns the final answer text.
    pub async fn chat(
        &self,
        state: &mut ConversationState,
        message: &str,
    ) -> Result<String, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        state.push(Turn::user(message));
        self.run(state).await?;
        Ok(final_answer(state.last()))
    }

    /// Drives `call_model ⇄ use_tool` from the current end of `state`.
    pub async fn run(&self, state: &mut ConversationState) -> Result<(), ChatError> {
        let mut turns = 0;
        loop {
            if let Some(max_turns) = self.max_turns
                && turns >= max_turns
            {
                warn!(max_turns, "tool loop turn limit reached");
                return Err(ChatError::TurnLimit { max_turns });
            }
            turns += 1;

            let reply = self.call_model(state).await;
            if !reply.has_function_calls() {
                debug!(turns, "model answered without tool calls");
                state.push(reply);
                return Ok(());
            }

            let calls: Vec<FunctionCall> = reply.function_calls().cloned().collect();
            state.push(reply);

            debug!(turns, calls = calls.len(), "model requested tools");
            let responses = self.use_tool(&calls).await;
            state.push(responses);
        }
    }

    async fn call_model(&self, state: &ConversationState) -> Turn {
        let request = ModelRequest::new(state.messages())
            .with_tools(self.tools.declarations())
            .with_system_instruction(self.system_instruction);

        match self.model.generate(&request).await {
            Ok(turn) => turn,
            Err(e) => {
                warn!(error = %e, "model call failed");
                Turn::model_text(format!("Error: {e}"))
            }
        }
    }

    /// One tool turn holding a response per call, in call order.
    async fn use_tool(&self, calls: &[FunctionCall]) -> Turn {
        debug_assert!(!calls.is_empty(), "use_tool entered without function calls");

        let mut responses = Vec::with_capacity(calls.len());
        for call in calls {
            info!(tool = %call.name, "invoking tool");
            let response = match self.tools.invoke(&call.name, &call.args).await {
                Ok(value) => value,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "tool invocation failed");
                    failure_response(&e)
                }
            };
            responses.push(FunctionResponse {
                name: call.name.clone(),
                response,
            });
        }
        Turn::tool(responses)
    }
}

/// First text part of the final turn, else a rendering of its last part.
fn final_answer(turn: Option<&Turn>) -> String {
    let Some(turn) = turn else {
        return NO_RESPONSE.to_string();
    };
    if let Some(text) = turn.text() {
        return text.to_string();
    }
    match turn.parts.last() {
        Some(Part::Text(text)) => text.clone(),
        Some(part) => serde_json::to_string(part).unwrap_or_else(|_| NO_RESPONSE.to_string()),
        None => NO_RESPONSE.to_string(),
    }
}
