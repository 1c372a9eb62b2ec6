use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(String),

    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode tool result: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Tool response the model sees when an invocation could not produce a record.
pub(crate) fn failure_response(e: &impl std::fmt::Display) -> Value {
    json!({"success": false, "content": format!("Error: {e}")})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_response_has_record_shape() {
        let value = failure_response(&ToolError::Unknown("launch_rocket".into()));
        assert_eq!(
            value,
            json!({"success": false, "content": "Error: unknown tool: launch_rocket"})
        );
    }

    #[test]
    fn invalid_arguments_names_the_tool() {
        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = ToolError::InvalidArguments {
            tool: "search_web".into(),
            source,
        };
        assert!(err.to_string().starts_with("invalid arguments for search_web:"));
    }
}
