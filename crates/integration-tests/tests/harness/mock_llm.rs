//! Scriptable mock LLM backend
//!
//! Serves a minimal OpenAI-compatible `/v1/chat/completions` endpoint.
//! Each incoming request consumes the next scripted response, so a test
//! can stage a tool-call stream followed by a final text stream and drive
//! the real HTTP/SSE plumbing end to end.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, routing};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// One canned reply to a chat-completions request
pub enum ScriptedResponse {
    /// SSE stream assembled from raw `data:` payload strings, terminated
    /// by `[DONE]`
    Stream(Vec<String>),
    /// Non-streaming JSON completion body
    Json(serde_json::Value),
    /// HTTP error status with a JSON error body
    Error(u16, String),
}

struct MockState {
    script: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<serde_json::Value>>,
}

/// A running mock backend, shut down on drop
pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockLlm {
    /// Start the mock with a response script, returning immediately
    pub async fn start(script: Vec<ScriptedResponse>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as a provider
    ///
    /// Includes `/v1` since adapters append `/chat/completions`.
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Raw request bodies received so far, in arrival order
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_chat_completions(
    State(state): State<Arc<MockState>>,
    Json(request): Json<serde_json::Value>,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(request);

    let Some(scripted) = state.script.lock().unwrap().pop_front() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"message": "mock script exhausted", "type": "server_error"}})),
        )
            .into_response();
    };

    match scripted {
        ScriptedResponse::Stream(payloads) => {
            let mut body = String::new();
            for payload in &payloads {
                body.push_str(&format!("data: {payload}\n\n"));
            }
            body.push_str("data: [DONE]\n\n");
            (
                StatusCode::OK,
                [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
                body,
            )
                .into_response()
        }
        ScriptedResponse::Json(value) => Json(value).into_response(),
        ScriptedResponse::Error(status, message) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({"error": {"message": message, "type": "invalid_request_error"}})),
        )
            .into_response(),
    }
}

// -- Chunk payload builders --

/// Content delta chunk
pub fn text_chunk(text: &str) -> String {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000u64,
        "model": "mock-model",
        "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
    })
    .to_string()
}

/// Reasoning delta chunk (DeepSeek/Groq shape)
pub fn reasoning_chunk(text: &str) -> String {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000u64,
        "model": "mock-model",
        "choices": [{"index": 0, "delta": {"reasoning_content": text}, "finish_reason": null}]
    })
    .to_string()
}

/// Fragmented tool-call chunk; `id` and `name` appear on the first
/// fragment only
pub fn tool_call_chunk(index: u32, id: Option<&str>, name: Option<&str>, arguments: Option<&str>) -> String {
    let mut function = serde_json::Map::new();
    if let Some(name) = name {
        function.insert("name".to_owned(), json!(name));
    }
    if let Some(arguments) = arguments {
        function.insert("arguments".to_owned(), json!(arguments));
    }

    let mut call = serde_json::Map::new();
    call.insert("index".to_owned(), json!(index));
    if let Some(id) = id {
        call.insert("id".to_owned(), json!(id));
        call.insert("type".to_owned(), json!("function"));
    }
    call.insert("function".to_owned(), serde_json::Value::Object(function));

    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000u64,
        "model": "mock-model",
        "choices": [{"index": 0, "delta": {"tool_calls": [call]}, "finish_reason": null}]
    })
    .to_string()
}

/// Final chunk carrying the finish reason
pub fn finish_chunk(reason: &str) -> String {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000u64,
        "model": "mock-model",
        "choices": [{"index": 0, "delta": {}, "finish_reason": reason}]
    })
    .to_string()
}

/// A complete text stream: one chunk per piece plus the stop marker
pub fn text_stream(pieces: &[&str]) -> Vec<String> {
    let mut payloads: Vec<String> = pieces.iter().map(|p| text_chunk(p)).collect();
    payloads.push(finish_chunk("stop"));
    payloads
}

/// A stream carrying one tool call with fragmented arguments
pub fn tool_call_stream(id: &str, name: &str, argument_fragments: &[&str]) -> Vec<String> {
    let mut payloads = vec![tool_call_chunk(0, Some(id), Some(name), None)];
    for fragment in argument_fragments {
        payloads.push(tool_call_chunk(0, None, None, Some(fragment)));
    }
    payloads.push(finish_chunk("tool_calls"));
    payloads
}

/// Non-streaming completion body
pub fn completion_json(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000u64,
        "model": "mock-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}
