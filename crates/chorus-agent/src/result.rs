//! Tool outcome normalization and size capping

use chorus_llm::types::{ErrorCode, ToolCall, ToolResult};
use serde_json::json;

use crate::traits::ToolExecutionError;

/// Maximum bytes of tool result content replayed to the model
pub const MAX_TOOL_RESULT_BYTES: usize = 64 * 1024;

/// Normalize a raw executor outcome into a `ToolResult`
///
/// An explicit code from the executor wins; otherwise the error text is
/// classified by keyword. Failure content is a small JSON object the model
/// can read back.
pub fn normalize(call: &ToolCall, outcome: Result<serde_json::Value, ToolExecutionError>) -> ToolResult {
    match outcome {
        Ok(value) => ToolResult {
            tool_call_id: call.id.clone(),
            name: call.function.name.clone(),
            content: value.to_string(),
            success: true,
            code: None,
        },
        Err(error) => {
            let code = error.code.unwrap_or_else(|| ErrorCode::classify(&error.message));
            ToolResult {
                tool_call_id: call.id.clone(),
                name: call.function.name.clone(),
                content: json!({
                    "success": false,
                    "code": code,
                    "message": error.message,
                })
                .to_string(),
                success: false,
                code: Some(code),
            }
        }
    }
}

/// Cap result content at [`MAX_TOOL_RESULT_BYTES`]
///
/// Oversized content is replaced by a notice carrying the original size.
/// Idempotent: the notice itself is far below the cap, so re-truncating
/// preserves `original_size`.
pub fn truncate(result: ToolResult) -> ToolResult {
    if result.content.len() <= MAX_TOOL_RESULT_BYTES {
        return result;
    }

    let original_size = result.content.len();
    tracing::warn!(
        tool = %result.name,
        original_size,
        "tool result exceeds size cap, replacing with truncation notice"
    );

    ToolResult {
        content: json!({
            "success": result.success,
            "code": result.code,
            "message": "truncated",
            "truncated": true,
            "original_size": original_size,
        })
        .to_string(),
        ..result
    }
}

#[cfg(test)]
mod tests {
    use chorus_llm::types::FunctionCall;

    use super::*;

    fn call() -> ToolCall {
        ToolCall {
            id: "call_1".to_owned(),
            function: FunctionCall {
                name: "searchNotes".to_owned(),
                arguments: "{}".to_owned(),
            },
        }
    }

    #[test]
    fn success_keeps_value_as_content() {
        let result = normalize(&call(), Ok(json!({"hits": 3})));
        assert!(result.success);
        assert_eq!(result.code, None);
        assert_eq!(result.content, r#"{"hits":3}"#);
    }

    #[test]
    fn explicit_code_wins_over_classification() {
        let error = ToolExecutionError::with_code(ErrorCode::RlsDenied, "permission denied");
        let result = normalize(&call(), Err(error));
        assert!(!result.success);
        // the text alone would classify as Forbidden
        assert_eq!(result.code, Some(ErrorCode::RlsDenied));
    }

    #[test]
    fn unclassified_error_text_is_classified() {
        let result = normalize(&call(), Err(ToolExecutionError::new("permission denied by policy")));
        assert_eq!(result.code, Some(ErrorCode::Forbidden));
    }

    #[test]
    fn oversized_content_becomes_notice() {
        let mut result = normalize(&call(), Ok(json!({})));
        result.content = "x".repeat(MAX_TOOL_RESULT_BYTES + 1);

        let truncated = truncate(result);
        let notice: serde_json::Value = serde_json::from_str(&truncated.content).unwrap();
        assert_eq!(notice["truncated"], json!(true));
        assert_eq!(notice["message"], json!("truncated"));
        assert_eq!(notice["original_size"], json!(MAX_TOOL_RESULT_BYTES + 1));
    }

    #[test]
    fn truncation_is_idempotent() {
        let mut result = normalize(&call(), Ok(json!({})));
        result.content = "y".repeat(MAX_TOOL_RESULT_BYTES * 2);

        let once = truncate(result);
        let twice = truncate(once.clone());
        let first: serde_json::Value = serde_json::from_str(&once.content).unwrap();
        let second: serde_json::Value = serde_json::from_str(&twice.content).unwrap();
        assert_eq!(first["original_size"], second["original_size"]);
        assert_eq!(second["truncated"], json!(true));
    }

    #[test]
    fn content_at_cap_is_untouched() {
        let mut result = normalize(&call(), Ok(json!({})));
        result.content = "z".repeat(MAX_TOOL_RESULT_BYTES);
        let kept = truncate(result.clone());
        assert_eq!(kept.content, result.content);
    }
}
