//! Conversion between canonical types and the OpenAI-compatible wire format

use crate::protocol::openai::{
    WireChoice, WireContent, WireContentPart, WireFunction, WireFunctionCall, WireImageUrl, WireMessage, WireRequest,
    WireResponse, WireStreamChoice, WireStreamChunk, WireTool, WireToolCall,
};
use crate::types::{
    Choice, ChoiceMessage, CompletionRequest, CompletionResponse, Content, ContentPart, FinishReason, FunctionCall,
    Message, Role, StreamDelta, StreamEvent, StreamFunctionCall, StreamToolCall, ToolCall, ToolChoice, Usage,
};

// -- Outbound: canonical request -> wire request --

impl From<&CompletionRequest> for WireRequest {
    fn from(req: &CompletionRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: req.messages.iter().map(Into::into).collect(),
            temperature: req.params.temperature,
            top_p: req.params.top_p,
            max_tokens: req.params.max_tokens,
            max_completion_tokens: None,
            stop: req.params.stop.clone(),
            stream: if req.stream { Some(true) } else { None },
            tools: req.tools.as_ref().map(|tools| {
                tools
                    .iter()
                    .map(|t| WireTool {
                        tool_type: t.tool_type.clone(),
                        function: WireFunction {
                            name: t.function.name.clone(),
                            description: t.function.description.clone(),
                            parameters: t.function.parameters.clone(),
                        },
                    })
                    .collect()
            }),
            tool_choice: req.tool_choice.map(|choice| {
                match choice {
                    ToolChoice::None => "none",
                    ToolChoice::Auto => "auto",
                    ToolChoice::Required => "required",
                }
                .to_owned()
            }),
            service_tier: None,
            parallel_tool_calls: None,
            reasoning_effort: None,
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let content = match &msg.content {
            Content::Text(text) => Some(WireContent::Text(text.clone())),
            Content::Parts(parts) => Some(WireContent::Parts(parts.iter().map(Into::into).collect())),
        };

        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|tc| WireToolCall {
                    id: tc.id.clone(),
                    tool_type: "function".to_owned(),
                    function: WireFunctionCall {
                        name: tc.function.name.clone(),
                        arguments: tc.function.arguments.clone(),
                    },
                })
                .collect()
        });

        Self {
            role: role.to_owned(),
            content,
            name: msg.name.clone(),
            reasoning_content: msg.reasoning.clone(),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl From<&ContentPart> for WireContentPart {
    fn from(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => Self::Text { text: text.clone() },
            ContentPart::Image { url, detail } => Self::ImageUrl {
                image_url: WireImageUrl {
                    url: url.clone(),
                    detail: detail.clone(),
                },
            },
        }
    }
}

// -- Inbound: wire response -> canonical response --

impl From<WireResponse> for CompletionResponse {
    fn from(resp: WireResponse) -> Self {
        Self {
            id: resp.id,
            created: resp.created,
            model: resp.model,
            choices: resp.choices.into_iter().map(Into::into).collect(),
            usage: resp.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        }
    }
}

impl From<WireChoice> for Choice {
    fn from(choice: WireChoice) -> Self {
        let finish_reason = choice.finish_reason.as_deref().and_then(parse_finish_reason);

        let tool_calls = choice.message.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|tc| ToolCall {
                    id: tc.id,
                    function: FunctionCall {
                        name: tc.function.name,
                        arguments: tc.function.arguments,
                    },
                })
                .collect()
        });

        Self {
            index: choice.index,
            message: ChoiceMessage {
                role: choice.message.role,
                content: choice.message.content,
                reasoning: choice.message.reasoning_content,
                tool_calls,
            },
            finish_reason,
        }
    }
}

// -- Stream conversion --

/// Convert a wire stream chunk into canonical stream events
pub fn chunk_to_events(chunk: &WireStreamChunk) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    for choice in &chunk.choices {
        events.push(StreamEvent::Delta(stream_choice_to_delta(choice)));

        // some vendors batch several tool-call fragments into one delta;
        // each becomes its own canonical event
        if let Some(calls) = &choice.delta.tool_calls {
            for call in calls.iter().skip(1) {
                events.push(StreamEvent::Delta(StreamDelta {
                    index: choice.index,
                    content: None,
                    reasoning: None,
                    tool_call: Some(to_stream_tool_call(call)),
                    finish_reason: None,
                }));
            }
        }
    }

    if let Some(usage) = &chunk.usage {
        events.push(StreamEvent::Usage(Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }));
    }

    events
}

/// Convert a wire stream choice to a canonical stream delta
fn stream_choice_to_delta(choice: &WireStreamChoice) -> StreamDelta {
    let finish_reason = choice.finish_reason.as_deref().and_then(parse_finish_reason);

    let tool_call = choice
        .delta
        .tool_calls
        .as_ref()
        .and_then(|calls| calls.first())
        .map(to_stream_tool_call);

    StreamDelta {
        index: choice.index,
        content: choice.delta.content.clone(),
        reasoning: choice.delta.reasoning_content.clone(),
        tool_call,
        finish_reason,
    }
}

fn to_stream_tool_call(call: &crate::protocol::openai::WireStreamToolCall) -> StreamToolCall {
    StreamToolCall {
        index: call.index,
        id: call.id.clone(),
        function: call.function.as_ref().map(|f| StreamFunctionCall {
            name: f.name.clone(),
            arguments: f.arguments.clone(),
        }),
    }
}

/// Map vendor finish-reason strings onto the four canonical values
fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" | "end_turn" => Some(FinishReason::Stop),
        "length" | "max_tokens" => Some(FinishReason::Length),
        "tool_calls" | "tool_use" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_chunk(json: &str) -> WireStreamChunk {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn finish_reason_aliases_collapse() {
        assert_eq!(parse_finish_reason("stop"), Some(FinishReason::Stop));
        assert_eq!(parse_finish_reason("end_turn"), Some(FinishReason::Stop));
        assert_eq!(parse_finish_reason("tool_use"), Some(FinishReason::ToolCalls));
        assert_eq!(parse_finish_reason("max_tokens"), Some(FinishReason::Length));
        assert_eq!(parse_finish_reason("banana"), None);
    }

    #[test]
    fn tool_message_maps_name_and_call_id() {
        let msg = Message::tool("call_1", "createNote", r#"{"ok":true}"#);
        let wire: WireMessage = (&msg).into();
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(wire.name.as_deref(), Some("createNote"));
    }

    #[test]
    fn reasoning_maps_to_reasoning_content() {
        let mut msg = Message::assistant("done");
        msg.reasoning = Some("thinking".to_owned());
        let wire: WireMessage = (&msg).into();
        assert_eq!(wire.reasoning_content.as_deref(), Some("thinking"));
    }

    #[test]
    fn reasoning_delta_is_surfaced() {
        let chunk = parse_chunk(
            r#"{"id":"c","choices":[{"index":0,"delta":{"reasoning_content":"hmm"},"finish_reason":null}]}"#,
        );
        let events = chunk_to_events(&chunk);
        let StreamEvent::Delta(delta) = &events[0] else {
            panic!("expected delta");
        };
        assert_eq!(delta.reasoning.as_deref(), Some("hmm"));
        assert!(delta.content.is_none());
    }

    // Two vendor chunk sequences encoding the same logical turn
    // ("hello", foo({"a":1}), stop) must normalize identically.
    #[test]
    fn vendor_chunk_sequences_normalize_identically() {
        let groq_shaped = [
            r#"{"id":"g1","object":"chat.completion.chunk","created":1,"model":"m","choices":[{"index":0,"delta":{"role":"assistant","content":"hello"},"finish_reason":null}]}"#,
            r#"{"id":"g1","object":"chat.completion.chunk","created":1,"model":"m","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"c1","type":"function","function":{"name":"foo","arguments":"{\"a\":1}"}}]},"finish_reason":null}]}"#,
            r#"{"id":"g1","object":"chat.completion.chunk","created":1,"model":"m","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
        ];
        let deepseek_shaped = [
            r#"{"id":"d1","choices":[{"index":0,"delta":{"content":"hello","reasoning_content":null},"finish_reason":null}]}"#,
            r#"{"id":"d1","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"foo","arguments":"{\"a\":1}"}}]},"finish_reason":null}]}"#,
            r#"{"id":"d1","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
        ];

        let normalize = |raw: &[&str]| -> Vec<String> {
            raw.iter()
                .flat_map(|json| chunk_to_events(&parse_chunk(json)))
                .map(|event| serde_json::to_string(&event).unwrap())
                .collect()
        };

        assert_eq!(normalize(&groq_shaped), normalize(&deepseek_shaped));
    }
}
