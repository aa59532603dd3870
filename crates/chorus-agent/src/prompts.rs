//! System-instruction variants and deterministic fallback text

use chorus_llm::types::ToolResult;

/// Appended to the system instructions when a stream aborts with a
/// tool-call validation failure, before the single automatic retry.
pub const CORRECTIVE_TOOL_RETRY: &str = "Your previous tool call was rejected as \
    invalid. Re-issue the call with arguments that are a single well-formed \
    JSON object matching the tool's schema, or answer in plain text without \
    calling a tool.";

/// Error-recovery variant of the system instructions
///
/// Used for the relaunch after a round in which at least one tool failed.
pub fn error_recovery(base: &str) -> String {
    format!(
        "{base}\n\nOne or more of your tool calls just failed. Read each \
         tool result carefully. State plainly which action failed and why, \
         based only on the result content, and propose one concrete remedy. \
         Never describe a failed action as successful."
    )
}

/// Deterministic final answer built from tool results
///
/// Used when every automated path to a model-written answer is exhausted.
/// The conversation never ends with a silent empty message.
pub fn fallback_summary(results: &[ToolResult]) -> String {
    if results.is_empty() {
        return "I could not produce a final answer this time. Would you like me to try again?".to_owned();
    }

    let mut lines = vec!["Here is what was done:".to_owned()];
    for result in results {
        let status = if result.success { "succeeded" } else { "failed" };
        let detail = extract_message(&result.content)
            .map(|m| format!(" — {}", clip(&m, 160)))
            .unwrap_or_default();
        lines.push(format!("- {} {status}{detail}", result.name));
    }
    lines.push("Would you like me to continue or make further changes?".to_owned());
    lines.join("\n")
}

fn extract_message(content: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_owned()
    } else {
        text.chars().take(max_chars).collect()
    }
}
