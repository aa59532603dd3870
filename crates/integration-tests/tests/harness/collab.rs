//! In-process collaborator doubles for orchestrator tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chorus_agent::events::AgentEvent;
use chorus_agent::traits::{Broadcast, Persistence, ToolExecutionError, ToolExecutor};
use chorus_llm::types::Message;

/// Records every persisted message
#[derive(Default)]
pub struct RecordingPersistence {
    messages: Mutex<Vec<Message>>,
}

impl RecordingPersistence {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Persistence for RecordingPersistence {
    async fn add_message(&self, _session_id: &str, message: &Message) -> anyhow::Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Records every broadcast event
#[derive(Default)]
pub struct RecordingBroadcast {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingBroadcast {
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Broadcast for RecordingBroadcast {
    async fn send(&self, event: &AgentEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Returns scripted outcomes, defaulting to `{"ok": true}`
#[derive(Default)]
pub struct ScriptedExecutor {
    outcomes: Mutex<VecDeque<Result<serde_json::Value, ToolExecutionError>>>,
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl ScriptedExecutor {
    pub fn push_outcome(&self, outcome: Result<serde_json::Value, ToolExecutionError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
        _auth_token: Option<&str>,
    ) -> Result<serde_json::Value, ToolExecutionError> {
        self.calls.lock().unwrap().push((name.to_owned(), arguments));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(serde_json::json!({"ok": true})))
    }
}
