//! Mock provider for testing
//!
//! Provides deterministic, configurable completions without network
//! dependencies. Every request is recorded so tests can inspect exactly what
//! the chat loop sent.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::traits::{Completion, Provider, TokenUsage};
use crate::logging::Logger;
use crate::types::{Role, Tool, ToolCall, Turn};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return these turns
    Turns(Vec<Turn>),
    /// Fail with a provider error carrying this message
    Fail(String),
}

impl MockReply {
    /// A plain assistant answer
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Turns(vec![Turn::assistant(text)])
    }

    /// An assistant turn requesting the given calls
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        MockReply::Turns(vec![Turn::assistant_with_calls(None, calls)])
    }
}

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Return scripted replies in order; running past the end is an error
    Script(Vec<MockReply>),
    /// Request the same tool on every call, with a fresh call id each time
    AlwaysCall {
        tool_name: String,
        arguments: Map<String, Value>,
    },
    /// Fail every request
    Error(String),
    /// Return no turns at all
    Empty,
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Conversation snapshot that was sent
    pub conversation: Vec<Turn>,
    /// Names of the tools that were offered
    pub tools: Vec<String>,
}

/// Mock LLM provider for testing
pub struct MockProvider {
    mode: MockMode,
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<MockRequest>>,
    delay_ms: u64,
    usage: Option<TokenUsage>,
    logger: Arc<dyn Logger>,
}

impl MockProvider {
    /// Create a mock provider in the given mode
    pub fn new(mode: MockMode, logger: Arc<dyn Logger>) -> Self {
        let script = match &mode {
            MockMode::Script(replies) => replies.iter().cloned().collect(),
            _ => VecDeque::new(),
        };
        Self {
            mode,
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            delay_ms: 0,
            usage: None,
            logger,
        }
    }

    /// Create an echo provider (echoes back the last user message)
    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::new(MockMode::Echo, logger)
    }

    /// Create a fixed response provider
    pub fn fixed(response: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::new(MockMode::Fixed(response.into()), logger)
    }

    /// Create a scripted provider
    pub fn scripted(replies: Vec<MockReply>, logger: Arc<dyn Logger>) -> Self {
        Self::new(MockMode::Script(replies), logger)
    }

    /// Create a provider that never stops asking for `tool_name`
    pub fn always_call(tool_name: impl Into<String>, arguments: Value, logger: Arc<dyn Logger>) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(
            MockMode::AlwaysCall {
                tool_name: tool_name.into(),
                arguments,
            },
            logger,
        )
    }

    /// Create an error-producing provider
    pub fn error(message: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::new(MockMode::Error(message.into()), logger)
    }

    /// Delay every reply, to give cancellation something to interrupt
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Report this token usage with every successful reply
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Extract last user message content
    fn last_user_message(conversation: &[Turn]) -> String {
        conversation
            .iter()
            .rev()
            .filter(|t| t.role == Role::User)
            .find_map(|t| t.text().filter(|s| !s.is_empty()))
            .unwrap_or("Hello from MockProvider!")
            .to_string()
    }

    fn next_reply(&self, conversation: &[Turn], call_number: usize) -> MockReply {
        match &self.mode {
            MockMode::Echo => {
                let user_msg = Self::last_user_message(conversation);
                self.logger.debug(&format!("[MockProvider] Echo mode, echoing: {}", user_msg));
                MockReply::text(format!("Echo: {}", user_msg))
            }
            MockMode::Fixed(response) => MockReply::text(response.clone()),
            MockMode::Script(_) => self
                .script
                .lock()
                .pop_front()
                .unwrap_or_else(|| MockReply::Fail("mock script exhausted".to_string())),
            MockMode::AlwaysCall { tool_name, arguments } => MockReply::tool_calls(vec![ToolCall::new(
                format!("call_{}", call_number),
                tool_name.clone(),
                Value::Object(arguments.clone()),
            )]),
            MockMode::Error(message) => MockReply::Fail(message.clone()),
            MockMode::Empty => MockReply::Turns(Vec::new()),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        match self.mode {
            MockMode::Echo => "mock-echo",
            MockMode::Script(_) => "mock-script",
            _ => "mock-fixed",
        }
    }

    fn endpoint(&self) -> String {
        "http://localhost:0/mock".to_string()
    }

    async fn complete(&self, conversation: &[Turn], tools: &[Tool]) -> ProviderResult<Completion> {
        let call_number = {
            let mut requests = self.requests.lock();
            requests.push(MockRequest {
                conversation: conversation.to_vec(),
                tools: tools.iter().map(|t| t.name.clone()).collect(),
            });
            requests.len()
        };
        self.logger.debug(&format!("[MockProvider] complete call #{}", call_number));

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        match self.next_reply(conversation, call_number) {
            MockReply::Turns(turns) => Ok(Completion {
                turns,
                usage: self.usage,
            }),
            MockReply::Fail(message) => Err(ProviderError::request_failed("mock", message)),
        }
    }
}
