//! Shared dialect-constraint validation
//!
//! Each vendor accepts a different subset of message shapes. Instead of
//! hand-written repair in every adapter, one rule table describes the
//! vendor's constraints and a single pass applies them: messages that
//! cannot be expressed are dropped with a logged reason, never silently
//! rewritten into something the caller did not say.

use std::collections::HashSet;

use crate::types::{Content, ContentPart, Message, Role};

/// Structural rules a vendor imposes on outgoing messages
#[derive(Debug, Clone)]
pub struct DialectRules {
    /// Vendor name used in log fields
    pub vendor: &'static str,
    /// Assistant messages with `tool_calls` must carry a reasoning field,
    /// even if empty
    pub require_reasoning_with_tool_calls: bool,
    /// Tool-role messages must not carry a `name` field
    pub forbid_tool_message_name: bool,
    /// Whether image content parts may travel inline; when false, images
    /// are stripped and only the textual parts are sent
    pub inline_images: bool,
}

impl DialectRules {
    /// Permissive baseline used by the generic OpenAI-compatible profile
    pub const fn permissive(vendor: &'static str) -> Self {
        Self {
            vendor,
            require_reasoning_with_tool_calls: false,
            forbid_tool_message_name: false,
            inline_images: true,
        }
    }

    /// Apply the rules to a thread, producing messages safe to convert
    ///
    /// Repairs applied, in order:
    /// - assistant messages with unresolved `tool_calls` (no inline
    ///   `tool_results` and no covering `tool` messages later in the
    ///   thread) are dropped;
    /// - inline `tool_results` are expanded into `tool` messages in
    ///   `tool_calls` order;
    /// - tool messages whose call was dropped above are dropped too;
    /// - per-vendor field rules (reasoning requirement, tool-name ban,
    ///   image stripping) are applied to the survivors.
    pub fn prepare(&self, messages: &[Message]) -> Vec<Message> {
        let answered = answered_ids(messages);
        let mut sent_calls: HashSet<String> = HashSet::new();
        let mut prepared = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg.role {
                Role::Assistant if msg.has_tool_calls() => {
                    let calls = msg.tool_calls.as_deref().unwrap_or_default();
                    let unresolved: Vec<&str> = calls
                        .iter()
                        .map(|c| c.id.as_str())
                        .filter(|id| !answered.contains(*id))
                        .collect();

                    if !unresolved.is_empty() {
                        tracing::warn!(
                            vendor = %self.vendor,
                            unresolved = ?unresolved,
                            "dropping assistant message with unresolved tool calls"
                        );
                        continue;
                    }

                    sent_calls.extend(calls.iter().map(|c| c.id.clone()));
                    let mut kept = self.apply_field_rules(msg.clone());

                    // Expand inline results into wire-level tool messages,
                    // in tool_calls order for determinism
                    if let Some(results) = kept.tool_results.take() {
                        prepared.push(kept);
                        for call in calls {
                            let Some(result) = results.iter().find(|r| r.tool_call_id == call.id) else {
                                continue;
                            };
                            let tool_msg =
                                Message::tool(&result.tool_call_id, &result.name, &result.content);
                            prepared.push(self.apply_field_rules(tool_msg));
                        }
                    } else {
                        prepared.push(kept);
                    }
                }
                Role::Tool => {
                    let id = msg.tool_call_id.as_deref().unwrap_or_default();
                    if sent_calls.contains(id) {
                        prepared.push(self.apply_field_rules(msg.clone()));
                    } else {
                        tracing::warn!(
                            vendor = %self.vendor,
                            tool_call_id = %id,
                            "dropping tool message whose call was not sent"
                        );
                    }
                }
                Role::System | Role::User | Role::Assistant => {
                    prepared.push(self.apply_field_rules(msg.clone()));
                }
            }
        }

        prepared
    }

    /// Apply single-message field rules
    fn apply_field_rules(&self, mut msg: Message) -> Message {
        if self.require_reasoning_with_tool_calls && msg.role == Role::Assistant && msg.has_tool_calls() {
            msg.reasoning.get_or_insert_with(String::new);
        }

        if self.forbid_tool_message_name && msg.role == Role::Tool && msg.name.take().is_some() {
            tracing::debug!(vendor = %self.vendor, "omitting name field on tool message");
        }

        if !self.inline_images
            && let Content::Parts(parts) = &msg.content
        {
            let images = parts.iter().filter(|p| matches!(p, ContentPart::Image { .. })).count();
            if images > 0 {
                tracing::warn!(vendor = %self.vendor, images, "stripping inline images the vendor cannot accept");
                msg.content = Content::Text(msg.content.as_text());
            }
        }

        msg
    }
}

/// Collect every tool call id answered anywhere in the thread
fn answered_ids(messages: &[Message]) -> HashSet<String> {
    let mut answered = HashSet::new();
    for msg in messages {
        if msg.role == Role::Tool
            && let Some(id) = &msg.tool_call_id
        {
            answered.insert(id.clone());
        }
        if let Some(results) = &msg.tool_results {
            answered.extend(results.iter().map(|r| r.tool_call_id.clone()));
        }
    }
    answered
}
