//! Thread validation and repair
//!
//! Raw histories arrive from storage or clients with missing fields,
//! unordered entries, and orphan tool messages. Normalization repairs what
//! it can and drops what it cannot, so every thread handed to a provider
//! converter satisfies the pairing invariant.

use std::cmp::Ordering;
use std::collections::HashSet;

use jiff::Timestamp;
use serde_json::Value;

use crate::types::{Content, ContentPart, Message, Role};

/// Outcome of a coherence check over a thread
#[derive(Debug, Clone)]
pub struct CoherenceReport {
    /// Whether every tool call is paired with a result
    pub is_valid: bool,
    /// One entry per missing pairing
    pub errors: Vec<String>,
}

/// Validate raw message values and normalize them into a coherent thread
///
/// Structurally invalid entries (missing role, tool messages without
/// `tool_call_id`/`name`) are dropped with a warning. Non-string content
/// is coerced to JSON text. Missing `id` and `timestamp` fields are
/// assigned. The result is stable-sorted by timestamp (entries without a
/// timestamp keep their relative position) and orphan tool messages are
/// removed.
pub fn validate_and_normalize_thread(raw: &[Value]) -> Vec<Message> {
    let mut messages: Vec<Message> = raw
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match normalize_message(value) {
            Some(message) => Some(message),
            None => {
                tracing::warn!(index, "dropping structurally invalid message");
                None
            }
        })
        .collect();

    messages.sort_by(|a, b| match (&a.timestamp, &b.timestamp) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => Ordering::Equal,
    });

    drop_orphan_tool_messages(messages)
}

/// Check the master pairing invariant over a normalized thread
///
/// Every assistant `tool_calls[i].id` must be answered by a `tool` message
/// with matching `tool_call_id` or by an inline `tool_results` entry.
pub fn validate_thread_coherence(thread: &[Message]) -> CoherenceReport {
    let answered: HashSet<&str> = thread
        .iter()
        .flat_map(|msg| {
            let from_tool = msg
                .tool_call_id
                .as_deref()
                .filter(|_| msg.role == Role::Tool)
                .into_iter();
            let from_inline = msg
                .tool_results
                .iter()
                .flatten()
                .map(|r| r.tool_call_id.as_str());
            from_tool.chain(from_inline)
        })
        .collect();

    let mut errors = Vec::new();
    for msg in thread {
        let Some(calls) = &msg.tool_calls else { continue };
        for call in calls {
            if !answered.contains(call.id.as_str()) {
                errors.push(format!("tool call {} ({}) has no matching tool message", call.id, call.function.name));
            }
        }
    }

    CoherenceReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Normalize one raw value into a `Message`, or reject it
fn normalize_message(value: &Value) -> Option<Message> {
    let role = match value.get("role").and_then(Value::as_str) {
        Some("system") => Role::System,
        Some("user") => Role::User,
        Some("assistant") => Role::Assistant,
        Some("tool") => Role::Tool,
        _ => return None,
    };

    let tool_call_id = value
        .get("tool_call_id")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let name = value.get("name").and_then(Value::as_str).map(str::to_owned);

    // Tool messages must identify which call they answer
    if role == Role::Tool && (tool_call_id.is_none() || name.is_none()) {
        return None;
    }

    let content = coerce_content(value.get("content"));

    let tool_calls = value
        .get("tool_calls")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .filter(|calls: &Vec<crate::types::ToolCall>| !calls.is_empty());

    let tool_results = value
        .get("tool_results")
        .and_then(|v| serde_json::from_value(v.clone()).ok());

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let id = value
        .get("id")
        .and_then(Value::as_str)
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_owned);

    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Timestamp>().ok())
        .unwrap_or_else(Timestamp::now);

    Some(Message {
        id: Some(id),
        role,
        content,
        name,
        tool_calls,
        tool_call_id,
        tool_results,
        reasoning,
        timestamp: Some(timestamp),
    })
}

/// Coerce arbitrary JSON content into canonical `Content`
fn coerce_content(value: Option<&Value>) -> Content {
    match value {
        None | Some(Value::Null) => Content::Text(String::new()),
        Some(Value::String(s)) => Content::Text(s.clone()),
        Some(array @ Value::Array(_)) => serde_json::from_value::<Vec<ContentPart>>(array.clone())
            .map_or_else(|_| Content::Text(array.to_string()), Content::Parts),
        Some(other) => Content::Text(other.to_string()),
    }
}

/// Drop tool messages whose `tool_call_id` is not announced by a preceding
/// assistant message
fn drop_orphan_tool_messages(messages: Vec<Message>) -> Vec<Message> {
    let mut announced: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role {
            Role::Assistant => {
                if let Some(calls) = &msg.tool_calls {
                    announced.extend(calls.iter().map(|c| c.id.clone()));
                }
                kept.push(msg);
            }
            Role::Tool => {
                let id = msg.tool_call_id.as_deref().unwrap_or_default();
                if announced.contains(id) {
                    kept.push(msg);
                } else {
                    tracing::warn!(tool_call_id = %id, "dropping orphan tool message");
                }
            }
            Role::System | Role::User => kept.push(msg),
        }
    }

    kept
}
