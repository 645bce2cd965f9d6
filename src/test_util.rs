use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use serde_json::Value;

use crate::providers::{Provider, ProviderFuture, ProviderResponse, ToolSpec};

/// Answers every call with a canned result and records the prompts.
#[derive(Clone)]
pub(crate) struct FakeProvider {
    answer: Result<Value, String>,
    pub(crate) seen: Arc<Mutex<Vec<String>>>,
    tools: Vec<ToolSpec>,
}

impl FakeProvider {
    pub(crate) fn answering(answer: Value) -> Self {
        Self {
            answer: Ok(answer),
            seen: Arc::new(Mutex::new(Vec::new())),
            tools: Vec::new(),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
            tools: Vec::new(),
        }
    }
}

impl Provider for FakeProvider {
    fn append_system_input(self, input: String) -> Self {
        self.seen.lock().expect("lock").push(input);
        self
    }

    fn append_user_input(self, input: String) -> Self {
        self.seen.lock().expect("lock").push(input);
        self
    }

    fn register_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    fn call_tool(self, tool_name: &str) -> ProviderFuture {
        let registered = self.tools.iter().any(|tool| tool.name == tool_name);
        let answer = self.answer.clone();
        Box::pin(async move {
            if !registered {
                return Err(anyhow!("tool not registered"));
            }
            let args = answer.map_err(|message| anyhow!(message))?;
            Ok(ProviderResponse {
                args,
                model: Some("fake-model".to_string()),
                usage: None,
            })
        })
    }
}
