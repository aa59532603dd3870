//! Reassembly of fragmented streaming tool calls
//!
//! Vendors split a tool call across many deltas: the id and name usually
//! arrive on the first fragment, the argument JSON dribbles in as string
//! pieces, and some vendors omit the id on continuation fragments and key
//! them by array index instead.

use std::collections::HashMap;

use chorus_llm::types::{FunctionCall, StreamToolCall, ToolCall};
use indexmap::IndexMap;
use uuid::Uuid;

#[derive(Default)]
struct PartialCall {
    name: String,
    arguments: String,
}

/// Accumulates tool-call fragments into complete calls
///
/// Keyed by call id, with a side map from array index to id so that
/// id-less continuation fragments land on the right entry. Emission
/// preserves first-seen order; entries that never received a name are
/// discarded as incomplete.
#[derive(Default)]
pub struct ToolCallAccumulator {
    entries: IndexMap<String, PartialCall>,
    index_to_id: HashMap<u32, String>,
}

impl ToolCallAccumulator {
    /// Fold one stream fragment into the accumulated state
    pub fn push(&mut self, fragment: StreamToolCall) {
        let id = match fragment.id.filter(|id| !id.is_empty()) {
            Some(id) => {
                self.index_to_id.insert(fragment.index, id.clone());
                id
            }
            None => match self.index_to_id.get(&fragment.index) {
                Some(id) => id.clone(),
                None => {
                    // fragment arrived before any id for this slot
                    let id = format!("call_{}", Uuid::new_v4());
                    self.index_to_id.insert(fragment.index, id.clone());
                    id
                }
            },
        };

        let entry = self.entries.entry(id).or_default();
        if let Some(function) = fragment.function {
            if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                entry.name = name;
            }
            if let Some(arguments) = function.arguments {
                entry.arguments.push_str(&arguments);
            }
        }
    }

    /// Whether any fragment has been seen
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Emit complete calls in first-seen order, dropping nameless entries
    pub fn finish(self) -> Vec<ToolCall> {
        self.entries
            .into_iter()
            .filter(|(_, partial)| !partial.name.is_empty())
            .map(|(id, partial)| ToolCall {
                id,
                function: FunctionCall {
                    name: partial.name,
                    arguments: partial.arguments,
                },
            })
            .collect()
    }
}
