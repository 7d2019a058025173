//! In-memory tool provider for testing
//!
//! Serves a fixed tool list, answers calls from per-tool replies and records
//! every call it receives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::{ToolError, ToolOutput, ToolProvider, ToolResult};
use crate::types::Tool;

/// How the mock answers calls to one tool
#[derive(Debug, Clone)]
pub enum MockToolReply {
    /// Return this text
    Text(String),
    /// The tool ran and reported an error in-band
    ToolError(String),
    /// The call itself failed (transport, protocol)
    Fail(String),
    /// Return the arguments serialized as JSON
    EchoArguments,
}

/// Mock tool provider
#[derive(Default)]
pub struct MockToolProvider {
    tools: Vec<Tool>,
    replies: HashMap<String, MockToolReply>,
    delays: HashMap<String, Duration>,
    discovery_error: Option<String>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockToolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer `tool`; calls to it echo their arguments unless a reply is set
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Answer calls to `name` with `reply`
    pub fn with_reply(mut self, name: impl Into<String>, reply: MockToolReply) -> Self {
        self.replies.insert(name.into(), reply);
        self
    }

    /// Make calls to `name` take `delay_ms` before answering
    pub fn with_delay(mut self, name: impl Into<String>, delay_ms: u64) -> Self {
        self.delays.insert(name.into(), Duration::from_millis(delay_ms));
        self
    }

    /// Make `discover_tools` fail
    pub fn failing_discovery(mut self, message: impl Into<String>) -> Self {
        self.discovery_error = Some(message.into());
        self
    }

    /// Calls received so far, in arrival order
    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Highest number of calls that were running at the same time
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolProvider for MockToolProvider {
    async fn discover_tools(&self) -> ToolResult<Vec<Tool>> {
        match &self.discovery_error {
            Some(message) => Err(ToolError::InvocationFailed(message.clone())),
            None => Ok(self.tools.clone()),
        }
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult<ToolOutput> {
        self.calls.lock().push((name.to_string(), arguments.clone()));

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(name) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.replies.get(name).cloned().unwrap_or(MockToolReply::EchoArguments) {
            MockToolReply::Text(text) => Ok(ToolOutput::text(text)),
            MockToolReply::ToolError(text) => Ok(ToolOutput::error(text)),
            MockToolReply::Fail(message) => Err(ToolError::InvocationFailed(message)),
            MockToolReply::EchoArguments => Ok(ToolOutput::text(Value::Object(arguments).to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_replies_and_recording() {
        let provider = MockToolProvider::new()
            .with_tool(Tool::new("echo", "Echo"))
            .with_reply("fixed", MockToolReply::Text("42".to_string()))
            .with_reply("broken", MockToolReply::Fail("pipe closed".to_string()));

        let echoed = provider.call_tool("echo", args(json!({"m": "hi"}))).await.unwrap();
        assert_eq!(echoed.text, r#"{"m":"hi"}"#);
        assert_eq!(provider.call_tool("fixed", Map::new()).await.unwrap().text, "42");
        assert!(provider.call_tool("broken", Map::new()).await.is_err());

        let names: Vec<_> = provider.calls().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["echo", "fixed", "broken"]);
    }

    #[tokio::test]
    async fn test_discovery() {
        let provider = MockToolProvider::new().with_tool(Tool::new("echo", "Echo"));
        assert_eq!(provider.discover_tools().await.unwrap().len(), 1);

        let failing = MockToolProvider::new().failing_discovery("down");
        assert!(failing.discover_tools().await.is_err());
    }
}
