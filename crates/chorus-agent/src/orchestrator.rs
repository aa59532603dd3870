//! Bounded multi-round tool-execution loop
//!
//! One user turn runs `Generating → {ToolsPending → ToolsExecuting →
//! Relaunching → Generating} | Complete` until the model stops requesting
//! tools or the round limit is hit. Tool execution is sequential and each
//! round's messages are persisted before the loop continues, so a crash
//! mid-round leaves a replayable, coherent history.

use std::sync::Arc;
use std::time::Duration;

use chorus_config::AgentConfig;
use chorus_llm::types::{
    CompletionRequest, CompletionResponse, Content, Message, StreamEvent, ToolCall, ToolDefinition, ToolResult,
};
use chorus_llm::{LlmError, Provider, ProviderRegistry};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::accumulator::ToolCallAccumulator;
use crate::batcher::TokenBatcher;
use crate::error::AgentError;
use crate::events::AgentEvent;
use crate::traits::{Broadcast, Persistence, ToolExecutionError, ToolExecutor};
use crate::{prompts, result};

/// One user turn to drive through the round loop
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Session the persisted messages belong to
    pub session_id: String,
    /// Registry name of the provider to use
    pub provider: String,
    /// Model override; the provider's configured default when absent
    pub model: Option<String>,
    /// Base system instructions
    pub system: String,
    /// Prior conversation, ending with the new user message
    pub messages: Vec<Message>,
    /// Tools offered to the model
    pub tools: Vec<ToolDefinition>,
    /// Opaque token forwarded to the tool executor
    pub auth_token: Option<String>,
}

/// Result of a completed turn
#[derive(Debug)]
pub struct TurnOutcome {
    /// Final assistant message, already persisted
    pub message: Message,
    /// Model rounds consumed
    pub rounds: u32,
    /// Every tool result produced during the turn, in execution order
    pub tool_results: Vec<ToolResult>,
}

/// Per-turn mutable state, dropped when the turn completes
struct RoundState {
    messages: Vec<Message>,
    round_index: u32,
    max_rounds: u32,
    recovery: bool,
    corrective_retry_used: bool,
    results: Vec<ToolResult>,
}

/// Everything one model round produced
struct RoundCollect {
    content: String,
    reasoning: String,
    calls: Vec<ToolCall>,
}

impl RoundCollect {
    fn from_response(response: &CompletionResponse) -> Self {
        let choice = response.choices.first();
        Self {
            content: response.first_content().unwrap_or_default().to_owned(),
            reasoning: choice
                .and_then(|c| c.message.reasoning.clone())
                .unwrap_or_default(),
            calls: response
                .first_tool_calls()
                .map(<[ToolCall]>::to_vec)
                .unwrap_or_default(),
        }
    }
}

/// Drives generate → execute → relaunch rounds for one user turn
///
/// All collaborators are injected; the orchestrator holds no global state.
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    config: AgentConfig,
    executor: Arc<dyn ToolExecutor>,
    persistence: Arc<dyn Persistence>,
    broadcast: Arc<dyn Broadcast>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        config: AgentConfig,
        executor: Arc<dyn ToolExecutor>,
        persistence: Arc<dyn Persistence>,
        broadcast: Arc<dyn Broadcast>,
    ) -> Self {
        Self {
            registry,
            config,
            executor,
            persistence,
            broadcast,
        }
    }

    /// Run one user turn to completion
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Model` when the model call and its
    /// non-streaming safety net both fail, and `AgentError::Persistence`
    /// when an append is rejected. Tool failures never surface here; they
    /// are fed back to the model as failed results.
    pub async fn run(&self, request: TurnRequest) -> Result<TurnOutcome, AgentError> {
        let provider = self.registry.get(&request.provider)?;
        let model = match &request.model {
            Some(model) => model.clone(),
            None => self.registry.default_model(&request.provider)?.to_owned(),
        };

        let mut state = RoundState {
            messages: std::iter::once(Message::system(&request.system))
                .chain(request.messages.iter().cloned())
                .collect(),
            round_index: 0,
            max_rounds: self.config.max_rounds,
            recovery: false,
            corrective_retry_used: false,
            results: Vec::new(),
        };

        while state.round_index < state.max_rounds {
            state.messages[0] = if state.recovery {
                Message::system(prompts::error_recovery(&request.system))
            } else {
                Message::system(&request.system)
            };

            let mut completion = CompletionRequest::new(&model, state.messages.clone());
            if !request.tools.is_empty() {
                completion.tools = Some(request.tools.clone());
            }

            let collected = match self.model_turn(provider.as_ref(), &completion).await {
                Ok(collected) => collected,
                Err(e) if is_tool_call_rejection(&e) && !state.corrective_retry_used => {
                    state.corrective_retry_used = true;
                    tracing::warn!(
                        provider = %request.provider,
                        error = %e,
                        "model rejected its own tool call, retrying once with corrective instructions"
                    );
                    state.messages.push(Message::system(prompts::CORRECTIVE_TOOL_RETRY));
                    continue;
                }
                Err(e) => {
                    self.emit(&AgentEvent::Error {
                        code: e.error_code(),
                        message: e.to_string(),
                    })
                    .await;
                    return Err(e.into());
                }
            };

            if collected.calls.is_empty() {
                return self
                    .complete_turn(provider.as_ref(), &request, &completion, collected, state)
                    .await;
            }

            self.execute_round(&request, collected, &mut state).await?;
        }

        self.finish_at_round_limit(provider.as_ref(), &request, &model, state)
            .await
    }

    /// One full model turn: stream first, non-streaming safety net second
    async fn model_turn(
        &self,
        provider: &dyn Provider,
        request: &CompletionRequest,
    ) -> Result<RoundCollect, LlmError> {
        match self.collect_stream(provider, request).await {
            Ok(collected) => Ok(collected),
            // handled by the caller's single corrective retry
            Err(e) if is_tool_call_rejection(&e) => Err(e),
            Err(e) if !e.is_retryable() => Err(e),
            Err(e) => {
                tracing::warn!(
                    provider = %provider.name(),
                    error = %e,
                    "streaming call failed, falling back to a non-streaming call"
                );
                let response = provider.complete(request).await?;
                Ok(RoundCollect::from_response(&response))
            }
        }
    }

    /// Drain one stream: batch tokens, forward reasoning, accumulate calls
    async fn collect_stream(
        &self,
        provider: &dyn Provider,
        request: &CompletionRequest,
    ) -> Result<RoundCollect, LlmError> {
        let mut stream = provider.complete_stream(request).await?;

        let mut batcher = TokenBatcher::new(
            self.broadcast.as_ref(),
            self.config.token_batch_size,
            self.config.broadcast_max_retries,
        );
        let mut accumulator = ToolCallAccumulator::default();
        let mut content = String::new();
        let mut reasoning = String::new();

        while let Some(item) = stream.next().await {
            match item? {
                StreamEvent::Delta(delta) => {
                    if let Some(text) = delta.content {
                        content.push_str(&text);
                        batcher.push(&text).await;
                    }
                    if let Some(text) = delta.reasoning {
                        reasoning.push_str(&text);
                        self.emit(&AgentEvent::Reasoning { text }).await;
                    }
                    if let Some(tool_call) = delta.tool_call {
                        accumulator.push(tool_call);
                    }
                }
                StreamEvent::Usage(_) => {}
                StreamEvent::Done => break,
            }
        }
        batcher.flush().await;

        Ok(RoundCollect {
            content,
            reasoning,
            calls: accumulator.finish(),
        })
    }

    /// Zero tool calls: persist the final answer, never an empty one
    async fn complete_turn(
        &self,
        provider: &dyn Provider,
        request: &TurnRequest,
        completion: &CompletionRequest,
        collected: RoundCollect,
        state: RoundState,
    ) -> Result<TurnOutcome, AgentError> {
        let mut final_text = collected.content;

        if final_text.trim().is_empty() {
            tracing::debug!(provider = %request.provider, "empty model turn, issuing non-streaming safety-net call");
            final_text = match provider.complete(completion).await {
                Ok(response) => response.first_content().unwrap_or_default().to_owned(),
                Err(e) => {
                    tracing::warn!(error = %e, "safety-net call failed");
                    String::new()
                }
            };
        }
        if final_text.trim().is_empty() {
            final_text = prompts::fallback_summary(&state.results);
        }

        let mut message = Message::assistant(final_text.clone());
        if !collected.reasoning.is_empty() {
            message.reasoning = Some(collected.reasoning);
        }
        stamp(&mut message);
        self.persist(&request.session_id, &message).await?;
        self.emit(&AgentEvent::Done { content: final_text }).await;

        Ok(TurnOutcome {
            message,
            rounds: state.round_index + 1,
            tool_results: state.results,
        })
    }

    /// Execute accumulated calls sequentially, persisting as we go
    async fn execute_round(
        &self,
        request: &TurnRequest,
        collected: RoundCollect,
        state: &mut RoundState,
    ) -> Result<(), AgentError> {
        let mut assistant = Message::assistant_tool_calls(collected.calls.clone());
        if !collected.content.is_empty() {
            assistant.content = Content::Text(collected.content);
        }
        if !collected.reasoning.is_empty() {
            assistant.reasoning = Some(collected.reasoning);
        }
        stamp(&mut assistant);
        self.persist(&request.session_id, &assistant).await?;
        self.emit(&AgentEvent::ToolCallsAnnounced {
            calls: collected.calls.clone(),
        })
        .await;
        state.messages.push(assistant);

        let mut any_failed = false;
        for call in &collected.calls {
            let result = result::truncate(self.execute_call(call, request.auth_token.as_deref()).await);
            any_failed |= !result.success;

            let mut tool_message = Message::tool(&result.tool_call_id, &result.name, &result.content);
            stamp(&mut tool_message);
            self.persist(&request.session_id, &tool_message).await?;
            self.emit(&AgentEvent::ToolResult {
                result: result.clone(),
            })
            .await;
            state.messages.push(tool_message);
            state.results.push(result);
        }

        self.emit(&AgentEvent::RoundComplete {
            round: state.round_index,
        })
        .await;
        state.recovery = any_failed;
        state.round_index += 1;
        Ok(())
    }

    /// Race one tool call against the execution timeout
    async fn execute_call(&self, call: &ToolCall, auth_token: Option<&str>) -> ToolResult {
        let arguments = match serde_json::from_str(&call.function.arguments) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    tool = %call.function.name,
                    error = %e,
                    "unparseable tool arguments, repairing to an empty object"
                );
                serde_json::json!({})
            }
        };

        let timeout = Duration::from_secs(self.config.tool_timeout_secs);
        let outcome = match tokio::time::timeout(
            timeout,
            self.executor.execute(&call.function.name, arguments, auth_token),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolExecutionError::with_code(
                chorus_llm::types::ErrorCode::Timeout,
                format!("tool execution timed out after {}s", self.config.tool_timeout_secs),
            )),
        };

        result::normalize(call, outcome)
    }

    /// Round limit reached: force a final answer without tools
    async fn finish_at_round_limit(
        &self,
        provider: &dyn Provider,
        request: &TurnRequest,
        model: &str,
        state: RoundState,
    ) -> Result<TurnOutcome, AgentError> {
        tracing::warn!(
            provider = %request.provider,
            max_rounds = state.max_rounds,
            "round limit reached, forcing a final answer without tools"
        );

        let completion = CompletionRequest::new(model, state.messages.clone());
        let final_text = match provider.complete(&completion).await {
            Ok(response) => response.first_content().unwrap_or_default().to_owned(),
            Err(e) => {
                tracing::warn!(error = %e, "forced final call failed");
                String::new()
            }
        };
        let final_text = if final_text.trim().is_empty() {
            prompts::fallback_summary(&state.results)
        } else {
            final_text
        };

        let mut message = Message::assistant(final_text.clone());
        stamp(&mut message);
        self.persist(&request.session_id, &message).await?;
        self.emit(&AgentEvent::Done { content: final_text }).await;

        Ok(TurnOutcome {
            message,
            rounds: state.max_rounds,
            tool_results: state.results,
        })
    }

    async fn persist(&self, session_id: &str, message: &Message) -> Result<(), AgentError> {
        self.persistence
            .add_message(session_id, message)
            .await
            .map_err(AgentError::Persistence)
    }

    async fn emit(&self, event: &AgentEvent) {
        if let Err(e) = self.broadcast.send(event).await {
            tracing::warn!(error = %e, "event publish failed");
        }
    }
}

fn stamp(message: &mut Message) {
    message.id = Some(Uuid::new_v4().to_string());
    message.timestamp = Some(jiff::Timestamp::now());
}

/// Generation failures the model can fix itself when told what went wrong
fn is_tool_call_rejection(error: &LlmError) -> bool {
    matches!(
        error,
        LlmError::Upstream { status: 400, message, .. }
            if message.contains("tool_use_failed") || message.contains("tool call validation")
    )
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chorus_llm::types::{
        Choice, ChoiceMessage, ErrorCode, FinishReason, Role, StreamDelta, StreamFunctionCall, StreamToolCall,
    };
    use chorus_llm::{EventStream, ProviderCapabilities};
    use serde_json::json;

    use super::*;

    type ScriptedStream = Vec<Result<StreamEvent, LlmError>>;

    #[derive(Default)]
    struct MockProvider {
        streams: Mutex<VecDeque<ScriptedStream>>,
        completions: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
        stream_requests: Mutex<Vec<CompletionRequest>>,
        complete_requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                streaming: true,
                tool_calling: true,
                reasoning: true,
            }
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.complete_requests.lock().unwrap().push(request.clone());
            self.completions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(LlmError::Upstream {
                        provider: "mock".to_owned(),
                        status: 500,
                        message: "no scripted completion".to_owned(),
                    })
                })
        }

        async fn complete_stream(&self, request: &CompletionRequest) -> Result<EventStream, LlmError> {
            self.stream_requests.lock().unwrap().push(request.clone());
            let events = self.streams.lock().unwrap().pop_front().unwrap_or_default();
            Ok(Box::pin(futures_util::stream::iter(events)))
        }
    }

    #[derive(Default)]
    struct MockExecutor {
        outcomes: Mutex<VecDeque<Result<serde_json::Value, ToolExecutionError>>>,
        calls: Mutex<Vec<(String, serde_json::Value)>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ToolExecutor for MockExecutor {
        async fn execute(
            &self,
            name: &str,
            arguments: serde_json::Value,
            _auth_token: Option<&str>,
        ) -> Result<serde_json::Value, ToolExecutionError> {
            self.calls.lock().unwrap().push((name.to_owned(), arguments));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"ok": true})))
        }
    }

    #[derive(Default)]
    struct MockPersistence {
        messages: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl Persistence for MockPersistence {
        async fn add_message(&self, _session_id: &str, message: &Message) -> anyhow::Result<()> {
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockBroadcast {
        events: Mutex<Vec<AgentEvent>>,
    }

    #[async_trait]
    impl Broadcast for MockBroadcast {
        async fn send(&self, event: &AgentEvent) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        provider: Arc<MockProvider>,
        executor: Arc<MockExecutor>,
        persistence: Arc<MockPersistence>,
        broadcast: Arc<MockBroadcast>,
    }

    fn harness(provider: MockProvider, executor: MockExecutor) -> Harness {
        let provider = Arc::new(provider);
        let executor = Arc::new(executor);
        let persistence = Arc::new(MockPersistence::default());
        let broadcast = Arc::new(MockBroadcast::default());

        let mut registry = ProviderRegistry::default();
        registry.insert("mock", "test-model", provider.clone());

        let orchestrator = Orchestrator::new(
            Arc::new(registry),
            AgentConfig::default(),
            executor.clone(),
            persistence.clone(),
            broadcast.clone(),
        );

        Harness {
            orchestrator,
            provider,
            executor,
            persistence,
            broadcast,
        }
    }

    fn turn(tools: Vec<ToolDefinition>) -> TurnRequest {
        TurnRequest {
            session_id: "session-1".to_owned(),
            provider: "mock".to_owned(),
            model: None,
            system: "You are a note-taking assistant.".to_owned(),
            messages: vec![Message::user("create a note titled hello")],
            tools,
            auth_token: None,
        }
    }

    fn note_tool() -> ToolDefinition {
        ToolDefinition::function("createNote", "create a note", json!({"type": "object"}))
    }

    fn text_delta(text: &str) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::Delta(StreamDelta {
            index: 0,
            content: Some(text.to_owned()),
            reasoning: None,
            tool_call: None,
            finish_reason: None,
        }))
    }

    fn call_delta(id: Option<&str>, name: Option<&str>, arguments: &str) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::Delta(StreamDelta {
            index: 0,
            content: None,
            reasoning: None,
            tool_call: Some(StreamToolCall {
                index: 0,
                id: id.map(str::to_owned),
                function: Some(StreamFunctionCall {
                    name: name.map(str::to_owned),
                    arguments: Some(arguments.to_owned()),
                }),
            }),
            finish_reason: None,
        }))
    }

    fn tool_call_stream(arguments: &str) -> ScriptedStream {
        vec![
            call_delta(Some("call_1"), Some("createNote"), ""),
            call_delta(None, None, arguments),
            Ok(StreamEvent::Done),
        ]
    }

    fn text_stream(text: &str) -> ScriptedStream {
        vec![text_delta(text), Ok(StreamEvent::Done)]
    }

    fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            id: "resp_1".to_owned(),
            created: 0,
            model: "test-model".to_owned(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: "assistant".to_owned(),
                    content: Some(text.to_owned()),
                    reasoning: None,
                    tool_calls: None,
                },
                finish_reason: Some(FinishReason::Stop),
            }],
            usage: None,
        }
    }

    #[tokio::test]
    async fn one_tool_call_then_confirmation() {
        let provider = MockProvider::default();
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(tool_call_stream(r#"{"title":"hello"}"#));
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(text_stream("Created the note \"hello\"."));
        let h = harness(provider, MockExecutor::default());

        let outcome = h.orchestrator.run(turn(vec![note_tool()])).await.unwrap();

        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.tool_results.len(), 1);
        assert!(outcome.tool_results[0].success);
        assert_eq!(outcome.message.content.as_text(), "Created the note \"hello\".");

        // durability: assistant tool_calls message, its tool answer, then
        // the final text, with the pairing invariant intact
        let persisted = h.persistence.messages.lock().unwrap();
        assert_eq!(persisted.len(), 3);
        assert!(persisted[0].has_tool_calls());
        assert_eq!(persisted[1].role, Role::Tool);
        assert_eq!(
            persisted[1].tool_call_id.as_deref(),
            Some(persisted[0].tool_calls.as_ref().unwrap()[0].id.as_str())
        );

        let calls = h.executor.calls.lock().unwrap();
        assert_eq!(calls[0].0, "createNote");
        assert_eq!(calls[0].1, json!({"title": "hello"}));

        let events = h.broadcast.events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(e, AgentEvent::ToolCallsAnnounced { .. })));
        assert!(events.iter().any(|e| matches!(e, AgentEvent::Done { .. })));
    }

    #[tokio::test]
    async fn failed_tool_triggers_recovery_instructions() {
        let provider = MockProvider::default();
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(tool_call_stream("{}"));
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(text_stream("I could not create the note: permission was denied."));
        let executor = MockExecutor::default();
        executor
            .outcomes
            .lock()
            .unwrap()
            .push_back(Err(ToolExecutionError::new("permission denied")));
        let h = harness(provider, executor);

        let outcome = h.orchestrator.run(turn(vec![note_tool()])).await.unwrap();

        assert!(!outcome.tool_results[0].success);
        assert_eq!(outcome.tool_results[0].code, Some(ErrorCode::Forbidden));
        assert!(outcome.message.content.as_text().contains("could not"));

        // the relaunch carried the error-recovery system variant
        let requests = h.provider.stream_requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let relaunch_system = requests[1].messages[0].content.as_text();
        assert!(relaunch_system.contains("Never describe a failed action as successful"));
    }

    #[tokio::test]
    async fn plain_answer_completes_in_one_round() {
        let provider = MockProvider::default();
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(text_stream("Nothing to do."));
        let h = harness(provider, MockExecutor::default());

        let outcome = h.orchestrator.run(turn(vec![note_tool()])).await.unwrap();

        assert_eq!(outcome.rounds, 1);
        assert!(outcome.tool_results.is_empty());
        assert!(h.executor.calls.lock().unwrap().is_empty());
        assert_eq!(h.persistence.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn adversarial_model_halts_at_round_limit() {
        let provider = MockProvider::default();
        for _ in 0..10 {
            provider
                .streams
                .lock()
                .unwrap()
                .push_back(tool_call_stream("{}"));
        }
        let h = harness(provider, MockExecutor::default());

        let outcome = h.orchestrator.run(turn(vec![note_tool()])).await.unwrap();

        assert_eq!(outcome.rounds, 10);
        assert_eq!(outcome.tool_results.len(), 10);
        // forced final call failed (nothing scripted), so the answer is the
        // deterministic summary of what the tools did
        assert!(outcome.message.content.as_text().contains("createNote"));

        // the forced final call offered no tools
        let finals = h.provider.complete_requests.lock().unwrap();
        assert_eq!(finals.len(), 1);
        assert!(finals[0].tools.is_none());
    }

    #[tokio::test]
    async fn empty_stream_uses_safety_net_call() {
        let provider = MockProvider::default();
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(vec![Ok(StreamEvent::Done)]);
        provider
            .completions
            .lock()
            .unwrap()
            .push_back(Ok(text_response("Here is the answer.")));
        let h = harness(provider, MockExecutor::default());

        let outcome = h.orchestrator.run(turn(vec![])).await.unwrap();

        assert_eq!(outcome.message.content.as_text(), "Here is the answer.");
        assert_eq!(h.provider.complete_requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_stream_and_failed_safety_net_still_answer() {
        let provider = MockProvider::default();
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(vec![Ok(StreamEvent::Done)]);
        let h = harness(provider, MockExecutor::default());

        let outcome = h.orchestrator.run(turn(vec![])).await.unwrap();

        assert!(!outcome.message.content.as_text().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out() {
        let provider = MockProvider::default();
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(tool_call_stream("{}"));
        provider.streams.lock().unwrap().push_back(text_stream("done"));
        let executor = MockExecutor {
            delay: Some(Duration::from_secs(600)),
            ..MockExecutor::default()
        };
        let h = harness(provider, executor);

        let outcome = h.orchestrator.run(turn(vec![note_tool()])).await.unwrap();

        assert!(!outcome.tool_results[0].success);
        assert_eq!(outcome.tool_results[0].code, Some(ErrorCode::Timeout));
    }

    #[tokio::test]
    async fn tool_call_rejection_gets_one_corrective_retry() {
        let provider = MockProvider::default();
        provider.streams.lock().unwrap().push_back(vec![Err(LlmError::Upstream {
            provider: "mock".to_owned(),
            status: 400,
            message: "tool_use_failed: arguments did not match schema".to_owned(),
        })]);
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(text_stream("Recovered without tools."));
        let h = harness(provider, MockExecutor::default());

        let outcome = h.orchestrator.run(turn(vec![note_tool()])).await.unwrap();

        assert_eq!(outcome.message.content.as_text(), "Recovered without tools.");
        let requests = h.provider.stream_requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let last_message = requests[1].messages.last().unwrap();
        assert_eq!(last_message.role, Role::System);
        assert!(last_message.content.as_text().contains("well-formed"));
    }

    #[tokio::test]
    async fn unparseable_arguments_repair_to_empty_object() {
        let provider = MockProvider::default();
        provider
            .streams
            .lock()
            .unwrap()
            .push_back(tool_call_stream("this is not json"));
        provider.streams.lock().unwrap().push_back(text_stream("done"));
        let h = harness(provider, MockExecutor::default());

        h.orchestrator.run(turn(vec![note_tool()])).await.unwrap();

        let calls = h.executor.calls.lock().unwrap();
        assert_eq!(calls[0].1, json!({}));
    }

    #[tokio::test]
    async fn stream_failure_falls_back_to_non_streaming() {
        let provider = MockProvider::default();
        provider.streams.lock().unwrap().push_back(vec![Err(LlmError::Streaming {
            provider: "mock".to_owned(),
            message: "connection reset".to_owned(),
        })]);
        provider
            .completions
            .lock()
            .unwrap()
            .push_back(Ok(text_response("Recovered answer.")));
        let h = harness(provider, MockExecutor::default());

        let outcome = h.orchestrator.run(turn(vec![])).await.unwrap();

        assert_eq!(outcome.message.content.as_text(), "Recovered answer.");
    }

    #[tokio::test]
    async fn model_and_safety_net_failure_is_fatal() {
        let provider = MockProvider::default();
        provider.streams.lock().unwrap().push_back(vec![Err(LlmError::Streaming {
            provider: "mock".to_owned(),
            message: "connection reset".to_owned(),
        })]);
        let h = harness(provider, MockExecutor::default());

        let err = h.orchestrator.run(turn(vec![])).await.unwrap_err();

        assert!(matches!(err, AgentError::Model(_)));
        let events = h.broadcast.events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(e, AgentEvent::Error { .. })));
    }
}
