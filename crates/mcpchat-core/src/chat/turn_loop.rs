//! Tool-augmented chat-turn loop
//!
//! One query runs through alternating model and tool rounds:
//!
//! ```text
//! AwaitingUserInput -> ModelPending -> Done
//!                          ^   |
//!                          |   v
//!                       ToolsPending
//! ```
//!
//! An assistant turn that requests tools is committed to the conversation
//! together with the tool turn answering it, once every call of the round has
//! finished. A failure or cancellation in the middle of a round therefore
//! never leaves half a round behind.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::conversation::Conversation;
use super::error::{ChatError, ChatResult};
use crate::config::{ChatSettings, DEFAULT_MAX_TOOL_ROUNDS};
use crate::logging::Logger;
use crate::providers::{Completion, Provider, ProviderError, TokenUsage};
use crate::tools::{ToolInvoker, ToolProvider, ToolRegistry, ToolResult};
use crate::types::{CancellationToken, Role, Tool, ToolCall, ToolCallResult, Turn};

/// Loop limits and behavior switches
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// Tool rounds allowed per query
    pub max_tool_rounds: u32,
    /// Run the calls of one round concurrently
    pub parallel_tool_calls: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            parallel_tool_calls: false,
        }
    }
}

impl From<&ChatSettings> for LoopConfig {
    fn from(settings: &ChatSettings) -> Self {
        Self {
            max_tool_rounds: settings.max_tool_rounds,
            parallel_tool_calls: settings.parallel_tool_calls,
        }
    }
}

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Idle; also the state after a failed query
    AwaitingUserInput,
    ModelPending,
    ToolsPending,
    /// The last query produced an answer
    Done,
}

/// Result of a successful query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Concatenated text of the final assistant turns; may be empty
    pub answer: String,
    /// Tool rounds that ran
    pub rounds: u32,
    /// Tool calls made across all rounds
    pub tool_calls: usize,
}

/// Running counters, for the `interactions` view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopStats {
    pub queries: u64,
    pub failed_queries: u64,
    pub model_calls: u64,
    pub tool_calls: u64,
    pub last_model_latency: Option<Duration>,
    pub total_model_latency: Duration,
    /// Usage of the most recent response that reported any
    pub last_usage: Option<TokenUsage>,
    /// Usage summed over every response that reported any
    pub total_usage: TokenUsage,
}

/// Hooks into the loop, for debug and raw display
pub trait LoopObserver: Send + Sync {
    /// About to call the model with this conversation and tool listing
    fn on_model_request(&self, _conversation: &[Turn], _tools: &[Tool]) {}

    /// The model answered; `usage` is present when the endpoint reported it
    fn on_model_response(&self, _turns: &[Turn], _usage: Option<&TokenUsage>, _latency: Duration) {}

    /// One tool call finished
    fn on_tool_result(&self, _call: &ToolCall, _result: &ToolCallResult) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl LoopObserver for NoopObserver {}

/// What a model response asks for next
enum Step {
    Answer(Vec<Turn>),
    Tools(Turn),
}

/// Chat-turn loop for one conversation
pub struct ChatTurnLoop {
    provider: Arc<dyn Provider>,
    invoker: ToolInvoker,
    conversation: Conversation,
    config: LoopConfig,
    state: LoopState,
    stats: LoopStats,
    observer: Arc<dyn LoopObserver>,
    logger: Arc<dyn Logger>,
}

impl ChatTurnLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        tool_provider: Arc<dyn ToolProvider>,
        system_prompt: impl Into<String>,
        config: LoopConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            provider,
            invoker: ToolInvoker::new(registry, tool_provider, logger.clone()),
            conversation: Conversation::new(system_prompt),
            config,
            state: LoopState::AwaitingUserInput,
            stats: LoopStats::default(),
            observer: Arc::new(NoopObserver),
            logger,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.invoker.registry()
    }

    /// Clear the conversation back to the system prompt
    pub fn reset(&mut self) {
        self.conversation.reset();
        self.state = LoopState::AwaitingUserInput;
        self.logger.info("[ChatTurnLoop] Conversation reset");
    }

    /// Swap in a new tool set
    pub fn replace_registry(&self, tools: Vec<Tool>) {
        self.invoker.registry().replace(tools);
    }

    /// Re-discover tools from the tool provider; keeps the old set on failure
    pub async fn refresh_tools(&self) -> ToolResult<usize> {
        self.invoker
            .registry()
            .refresh(self.invoker.provider().as_ref())
            .await
    }

    /// Run one user query to a final answer
    pub async fn process_query(
        &mut self,
        query: &str,
        cancel: &CancellationToken,
    ) -> ChatResult<QueryOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ChatError::EmptyQuery);
        }
        if cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }

        self.stats.queries += 1;
        self.conversation.append(Turn::user(query))?;
        self.logger.info(&format!(
            "[ChatTurnLoop] Query received ({} turns in conversation)",
            self.conversation.len()
        ));

        let result = self.run_rounds(cancel).await;
        match &result {
            Ok(outcome) => {
                self.state = LoopState::Done;
                self.logger.info(&format!(
                    "[ChatTurnLoop] Query done after {} round(s), {} tool call(s)",
                    outcome.rounds, outcome.tool_calls
                ));
            }
            Err(e) => {
                self.state = LoopState::AwaitingUserInput;
                self.stats.failed_queries += 1;
                self.logger.warn(&format!("[ChatTurnLoop] Query failed: {}", e));
            }
        }
        result
    }

    async fn run_rounds(&mut self, cancel: &CancellationToken) -> ChatResult<QueryOutcome> {
        let mut rounds = 0u32;
        let mut tool_calls = 0usize;

        loop {
            let response = self.call_model(cancel).await?;

            match self.interpret(response)? {
                Step::Answer(turns) => {
                    let answer: String = turns.iter().filter_map(Turn::text).collect();
                    for turn in turns {
                        self.conversation.append(turn)?;
                    }
                    return Ok(QueryOutcome {
                        answer,
                        rounds,
                        tool_calls,
                    });
                }
                Step::Tools(request) => {
                    if rounds >= self.config.max_tool_rounds {
                        self.logger.warn(&format!(
                            "[ChatTurnLoop] Model still requesting tools after {} rounds",
                            rounds
                        ));
                        return Err(ChatError::ToolLoopExceeded {
                            max_rounds: self.config.max_tool_rounds,
                        });
                    }

                    let results = self.run_tools(&request.tool_calls, cancel).await?;
                    tool_calls += results.len();
                    self.stats.tool_calls += results.len() as u64;
                    self.conversation
                        .append_round(request, Turn::tool_results(results))?;
                    rounds += 1;
                }
            }
        }
    }

    async fn call_model(&mut self, cancel: &CancellationToken) -> ChatResult<Vec<Turn>> {
        self.state = LoopState::ModelPending;
        let tools = self.invoker.registry().list();
        let snapshot = self.conversation.snapshot();
        self.observer.on_model_request(&snapshot, &tools);

        let started = Instant::now();
        let response = cancel
            .run_until_cancelled(self.provider.complete(&snapshot, &tools))
            .await;
        let latency = started.elapsed();

        let Completion { turns, usage } = match response {
            None => {
                self.logger.info("[ChatTurnLoop] Cancelled while waiting for the model");
                return Err(ChatError::Cancelled);
            }
            Some(Err(e)) => {
                self.logger.error(&format!("[ChatTurnLoop] Model call failed: {}", e));
                return Err(ChatError::ModelUnavailable(e));
            }
            Some(Ok(completion)) => completion,
        };

        self.stats.model_calls += 1;
        self.stats.last_model_latency = Some(latency);
        self.stats.total_model_latency += latency;
        if let Some(usage) = usage {
            self.stats.last_usage = Some(usage);
            self.stats.total_usage += usage;
        }
        self.observer.on_model_response(&turns, usage.as_ref(), latency);
        self.logger.debug(&format!(
            "[ChatTurnLoop] Model returned {} turn(s) in {:?}",
            turns.len(),
            latency
        ));

        Ok(turns)
    }

    /// Decide whether a response is a final answer or a tool request
    fn interpret(&self, response: Vec<Turn>) -> ChatResult<Step> {
        let mut assistant_turns = Vec::with_capacity(response.len());
        for turn in response {
            if turn.role == Role::Assistant {
                assistant_turns.push(turn);
            } else {
                self.logger.warn(&format!(
                    "[ChatTurnLoop] Dropping unexpected {} turn from model response",
                    turn.role
                ));
            }
        }

        if !assistant_turns.iter().any(Turn::requests_tools) {
            return Ok(Step::Answer(assistant_turns));
        }

        // fold everything into one request turn so the round stays a pair
        let text: String = assistant_turns.iter().filter_map(Turn::text).collect();
        let calls: Vec<ToolCall> = assistant_turns
            .into_iter()
            .flat_map(|t| t.tool_calls)
            .collect();

        let mut seen = HashSet::new();
        for call in &calls {
            if !seen.insert(call.call_id.as_str()) {
                return Err(ChatError::ModelUnavailable(ProviderError::invalid_response(
                    self.provider.name(),
                    format!("duplicate tool call id '{}'", call.call_id),
                )));
            }
        }

        let text = (!text.is_empty()).then_some(text);
        Ok(Step::Tools(Turn::assistant_with_calls(text, calls)))
    }

    async fn run_tools(
        &mut self,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> ChatResult<Vec<ToolCallResult>> {
        self.state = LoopState::ToolsPending;
        self.logger.info(&format!(
            "[ChatTurnLoop] Running {} tool call(s){}",
            calls.len(),
            if self.config.parallel_tool_calls { " in parallel" } else { "" }
        ));

        let results = cancel
            .run_until_cancelled(self.invoker.invoke_round(calls, self.config.parallel_tool_calls))
            .await
            .ok_or_else(|| {
                self.logger.info("[ChatTurnLoop] Cancelled during tool round");
                ChatError::Cancelled
            })?;

        for (call, result) in calls.iter().zip(&results) {
            self.observer.on_tool_result(call, result);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::providers::{MockProvider, MockReply};
    use crate::tools::{MockToolProvider, MockToolReply};
    use parking_lot::Mutex;
    use serde_json::json;

    fn registry(logger: &Arc<dyn Logger>) -> Arc<ToolRegistry> {
        Arc::new(ToolRegistry::with_tools(
            vec![
                Tool::new("echo", "Echo the message").with_schema(json!({
                    "type": "object",
                    "properties": { "message": { "type": "string" } },
                    "required": ["message"]
                })),
                Tool::new("slow", "Takes a while"),
            ],
            logger.clone(),
        ))
    }

    fn chat_loop(
        provider: Arc<MockProvider>,
        tools: Arc<MockToolProvider>,
        config: LoopConfig,
    ) -> ChatTurnLoop {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        ChatTurnLoop::new(provider, registry(&logger), tools, "sys", config, logger)
    }

    fn call(id: &str, tool: &str) -> ToolCall {
        ToolCall::new(id, tool, json!({ "message": id }))
    }

    #[tokio::test]
    async fn test_plain_answer_grows_by_two() {
        let provider = Arc::new(MockProvider::fixed("Hi there", Arc::new(NoOpLogger)));
        let mut chat = chat_loop(provider.clone(), Arc::new(MockToolProvider::new()), LoopConfig::default());

        let outcome = chat.process_query("  hello  ", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "Hi there");
        assert_eq!(outcome.rounds, 0);
        assert_eq!(chat.conversation().len(), 3);
        assert_eq!(chat.conversation().turns()[1].text(), Some("hello"));
        assert_eq!(chat.state(), LoopState::Done);
        // the model saw the tool listing
        assert_eq!(provider.requests()[0].tools, vec!["echo", "slow"]);
    }

    #[tokio::test]
    async fn test_empty_query_leaves_conversation_unchanged() {
        let provider = Arc::new(MockProvider::echo(Arc::new(NoOpLogger)));
        let mut chat = chat_loop(provider.clone(), Arc::new(MockToolProvider::new()), LoopConfig::default());

        let err = chat.process_query(" \n\t", &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ChatError::EmptyQuery));
        assert_eq!(chat.conversation().len(), 1);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_one_tool_round_grows_by_four() {
        let provider = Arc::new(MockProvider::scripted(
            vec![
                MockReply::tool_calls(vec![call("c1", "echo")]),
                MockReply::text("The tool said c1"),
            ],
            Arc::new(NoOpLogger),
        ));
        let tools = Arc::new(MockToolProvider::new());
        let mut chat = chat_loop(provider.clone(), tools.clone(), LoopConfig::default());

        let outcome = chat.process_query("use the tool", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "The tool said c1");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.tool_calls, 1);
        assert_eq!(chat.conversation().len(), 5);
        assert_eq!(tools.call_count(), 1);

        let turns = chat.conversation().turns();
        assert!(turns[2].requests_tools());
        assert_eq!(turns[3].role, Role::Tool);
        assert_eq!(turns[3].tool_results[0].call_id, "c1");
        assert_eq!(turns[3].tool_results[0].payload, r#"{"message":"c1"}"#);

        // second model request carried the completed round
        assert_eq!(provider.requests()[1].conversation.len(), 4);
    }

    #[tokio::test]
    async fn test_results_keep_call_order_in_parallel() {
        let provider = Arc::new(MockProvider::scripted(
            vec![
                MockReply::tool_calls(vec![call("c1", "slow"), call("c2", "echo"), call("c3", "echo")]),
                MockReply::text("done"),
            ],
            Arc::new(NoOpLogger),
        ));
        let tools = Arc::new(MockToolProvider::new().with_delay("slow", 30));
        let config = LoopConfig {
            parallel_tool_calls: true,
            ..Default::default()
        };
        let mut chat = chat_loop(provider, tools.clone(), config);

        chat.process_query("go", &CancellationToken::new()).await.unwrap();

        let ids: Vec<_> = chat.conversation().turns()[3]
            .tool_results
            .iter()
            .map(|r| r.call_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert!(tools.max_concurrency() > 1);
    }

    #[tokio::test]
    async fn test_cap_exceeded() {
        let provider = Arc::new(MockProvider::always_call("echo", json!({"message": "again"}), Arc::new(NoOpLogger)));
        let tools = Arc::new(MockToolProvider::new());
        let config = LoopConfig {
            max_tool_rounds: 3,
            ..Default::default()
        };
        let mut chat = chat_loop(provider.clone(), tools.clone(), config);

        let err = chat.process_query("loop forever", &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ChatError::ToolLoopExceeded { max_rounds: 3 }));
        // system + user + 3 * (assistant + tool)
        let turns = chat.conversation().turns();
        assert_eq!(turns.len(), 2 + 2 * 3);
        assert_eq!(turns.iter().filter(|t| t.role == Role::Assistant).count(), 3);
        assert_eq!(turns.iter().filter(|t| t.role == Role::Tool).count(), 3);
        assert_eq!(provider.call_count(), 4);
        assert_eq!(tools.call_count(), 3);
    }

    #[tokio::test]
    async fn test_model_failure_leaves_only_user_turn() {
        let provider = Arc::new(MockProvider::error("connection refused", Arc::new(NoOpLogger)));
        let mut chat = chat_loop(provider, Arc::new(MockToolProvider::new()), LoopConfig::default());

        let err = chat.process_query("hello", &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ChatError::ModelUnavailable(_)));
        assert_eq!(chat.conversation().len(), 2);
        assert_eq!(chat.conversation().last().map(|t| t.role), Some(Role::User));
        assert_eq!(chat.stats().failed_queries, 1);
    }

    #[tokio::test]
    async fn test_conversation_usable_after_failure() {
        let provider = Arc::new(MockProvider::scripted(
            vec![MockReply::Fail("timeout".to_string()), MockReply::text("back again")],
            Arc::new(NoOpLogger),
        ));
        let mut chat = chat_loop(provider, Arc::new(MockToolProvider::new()), LoopConfig::default());

        assert!(chat.process_query("first", &CancellationToken::new()).await.is_err());
        let outcome = chat.process_query("second", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "back again");
        assert_eq!(chat.conversation().len(), 4);
    }

    #[tokio::test]
    async fn test_tool_failures_are_fed_back() {
        let provider = Arc::new(MockProvider::scripted(
            vec![
                MockReply::tool_calls(vec![call("c1", "missing"), call("c2", "echo")]),
                MockReply::text("recovered"),
            ],
            Arc::new(NoOpLogger),
        ));
        let tools = Arc::new(
            MockToolProvider::new().with_reply("echo", MockToolReply::Fail("broken pipe".to_string())),
        );
        let mut chat = chat_loop(provider, tools.clone(), LoopConfig::default());

        let outcome = chat.process_query("try", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "recovered");
        let results = &chat.conversation().turns()[3].tool_results;
        assert_eq!(results[0].payload, "Error: Tool not found: missing");
        assert_eq!(results[1].payload, "Error: broken pipe");
        // the unknown tool never reached the provider
        assert_eq!(tools.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_response_is_empty_answer() {
        let provider = Arc::new(MockProvider::new(crate::providers::MockMode::Empty, Arc::new(NoOpLogger)));
        let mut chat = chat_loop(provider, Arc::new(MockToolProvider::new()), LoopConfig::default());

        let outcome = chat.process_query("anything", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "");
        assert_eq!(chat.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_call_ids_are_malformed() {
        let provider = Arc::new(MockProvider::scripted(
            vec![MockReply::tool_calls(vec![call("same", "echo"), call("same", "echo")])],
            Arc::new(NoOpLogger),
        ));
        let tools = Arc::new(MockToolProvider::new());
        let mut chat = chat_loop(provider, tools.clone(), LoopConfig::default());

        let err = chat.process_query("q", &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ChatError::ModelUnavailable(_)));
        assert_eq!(chat.conversation().len(), 2);
        assert_eq!(tools.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_assistant_turns_dropped_with_warning() {
        let provider = Arc::new(MockProvider::scripted(
            vec![MockReply::Turns(vec![Turn::user("injected"), Turn::assistant("real answer")])],
            Arc::new(NoOpLogger),
        ));
        let logger = Arc::new(MemoryLogger::new());
        let shared: Arc<dyn Logger> = logger.clone();
        let mut chat = ChatTurnLoop::new(
            provider,
            registry(&shared),
            Arc::new(MockToolProvider::new()),
            "sys",
            LoopConfig::default(),
            shared,
        );

        let outcome = chat.process_query("q", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.answer, "real answer");
        assert_eq!(chat.conversation().len(), 3);
        assert!(logger
            .messages_at(LogLevel::Warn)
            .iter()
            .any(|m| m.contains("Dropping unexpected user turn")));
    }

    #[tokio::test]
    async fn test_answer_concatenates_assistant_text() {
        let provider = Arc::new(MockProvider::scripted(
            vec![MockReply::Turns(vec![Turn::assistant("Hello, "), Turn::assistant("world")])],
            Arc::new(NoOpLogger),
        ));
        let mut chat = chat_loop(provider, Arc::new(MockToolProvider::new()), LoopConfig::default());

        let outcome = chat.process_query("q", &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.answer, "Hello, world");
        assert_eq!(chat.conversation().len(), 4);
    }

    #[tokio::test]
    async fn test_cancel_during_tool_round_appends_nothing() {
        let provider = Arc::new(MockProvider::scripted(
            vec![MockReply::tool_calls(vec![call("c1", "slow")])],
            Arc::new(NoOpLogger),
        ));
        let tools = Arc::new(MockToolProvider::new().with_delay("slow", 5_000));
        let mut chat = chat_loop(provider, tools.clone(), LoopConfig::default());

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = chat.process_query("q", &token).await.unwrap_err();

        assert!(matches!(err, ChatError::Cancelled));
        assert_eq!(tools.call_count(), 1);
        assert_eq!(chat.conversation().len(), 2);
        assert_eq!(chat.state(), LoopState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn test_cancel_during_model_call() {
        let provider = Arc::new(MockProvider::fixed("too late", Arc::new(NoOpLogger)).with_delay(5_000));
        let mut chat = chat_loop(provider, Arc::new(MockToolProvider::new()), LoopConfig::default());

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = chat.process_query("q", &token).await.unwrap_err();
        assert!(matches!(err, ChatError::Cancelled));
        assert_eq!(chat.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_already_cancelled_token() {
        let provider = Arc::new(MockProvider::echo(Arc::new(NoOpLogger)));
        let mut chat = chat_loop(provider, Arc::new(MockToolProvider::new()), LoopConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        assert!(matches!(chat.process_query("q", &token).await, Err(ChatError::Cancelled)));
        assert_eq!(chat.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_stats_and_reset() {
        let provider = Arc::new(MockProvider::scripted(
            vec![
                MockReply::tool_calls(vec![call("c1", "echo"), call("c2", "echo")]),
                MockReply::text("ok"),
            ],
            Arc::new(NoOpLogger),
        ));
        let mut chat = chat_loop(provider, Arc::new(MockToolProvider::new()), LoopConfig::default());

        chat.process_query("q", &CancellationToken::new()).await.unwrap();

        let stats = chat.stats();
        assert_eq!(stats.queries, 1);
        assert_eq!(stats.model_calls, 2);
        assert_eq!(stats.tool_calls, 2);
        assert!(stats.last_model_latency.is_some());

        chat.reset();
        assert_eq!(chat.conversation().len(), 1);
        assert_eq!(chat.stats().queries, 1);
    }

    #[tokio::test]
    async fn test_token_usage_is_totalled() {
        let provider = Arc::new(
            MockProvider::scripted(
                vec![MockReply::tool_calls(vec![call("c1", "echo")]), MockReply::text("ok")],
                Arc::new(NoOpLogger),
            )
            .with_usage(TokenUsage::new(100, 20)),
        );
        let mut chat = chat_loop(provider, Arc::new(MockToolProvider::new()), LoopConfig::default());

        chat.process_query("q", &CancellationToken::new()).await.unwrap();

        let stats = chat.stats();
        assert_eq!(stats.last_usage, Some(TokenUsage::new(100, 20)));
        assert_eq!(stats.total_usage, TokenUsage::new(200, 40));
        assert_eq!(stats.total_usage.total_tokens, 240);
    }

    #[tokio::test]
    async fn test_several_request_turns_fold_into_one_round() {
        let provider = Arc::new(MockProvider::scripted(
            vec![
                MockReply::Turns(vec![
                    Turn::assistant_with_calls(Some("First, ".to_string()), vec![call("c1", "echo")]),
                    Turn::assistant("then "),
                    Turn::assistant_with_calls(Some("second.".to_string()), vec![call("c2", "echo")]),
                ]),
                MockReply::text("done"),
            ],
            Arc::new(NoOpLogger),
        ));
        let tools = Arc::new(MockToolProvider::new());
        let mut chat = chat_loop(provider, tools.clone(), LoopConfig::default());

        let outcome = chat.process_query("q", &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.tool_calls, 2);
        assert_eq!(tools.call_count(), 2);
        // system, user, one folded request, one tool turn, answer
        let turns = chat.conversation().turns();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[2].role, Role::Assistant);
        assert_eq!(turns[2].text(), Some("First, then second."));
        let ids: Vec<_> = turns[2].tool_calls.iter().map(|c| c.call_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        let answered: Vec<_> = turns[3].tool_results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(answered, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_unusable_arguments_are_fed_back_as_failure() {
        let provider = Arc::new(MockProvider::scripted(
            vec![
                MockReply::tool_calls(vec![ToolCall::new("c1", "echo", json!("{\"message\": "))]),
                MockReply::text("sorry"),
            ],
            Arc::new(NoOpLogger),
        ));
        let tools = Arc::new(MockToolProvider::new());
        let mut chat = chat_loop(provider.clone(), tools.clone(), LoopConfig::default());

        chat.process_query("q", &CancellationToken::new()).await.unwrap();

        assert_eq!(tools.call_count(), 0);
        let result = &chat.conversation().turns()[3].tool_results[0];
        assert!(!result.succeeded);
        assert!(result.payload.contains("arguments must be a JSON object"));
        // the model sees what it actually sent
        let replayed = &provider.requests()[1].conversation[2].tool_calls[0];
        assert_eq!(replayed.arguments_value(), json!("{\"message\": "));
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl LoopObserver for RecordingObserver {
        fn on_model_request(&self, conversation: &[Turn], _tools: &[Tool]) {
            self.events.lock().push(format!("request:{}", conversation.len()));
        }

        fn on_model_response(&self, turns: &[Turn], usage: Option<&TokenUsage>, _latency: Duration) {
            let tokens = usage.map(|u| u.total_tokens).unwrap_or(0);
            self.events
                .lock()
                .push(format!("response:{}:{}", turns.len(), tokens));
        }

        fn on_tool_result(&self, call: &ToolCall, result: &ToolCallResult) {
            self.events
                .lock()
                .push(format!("tool:{}:{}", call.call_id, result.succeeded));
        }
    }

    #[tokio::test]
    async fn test_observer_sees_each_step() {
        let provider = Arc::new(MockProvider::scripted(
            vec![MockReply::tool_calls(vec![call("c1", "echo")]), MockReply::text("ok")],
            Arc::new(NoOpLogger),
        ));
        let observer = Arc::new(RecordingObserver::default());
        let mut chat = chat_loop(provider, Arc::new(MockToolProvider::new()), LoopConfig::default())
            .with_observer(observer.clone());

        chat.process_query("q", &CancellationToken::new()).await.unwrap();

        assert_eq!(
            *observer.events.lock(),
            vec!["request:2", "response:1:0", "tool:c1:true", "request:4", "response:1:0"]
        );
    }

    #[tokio::test]
    async fn test_refresh_tools_swaps_registry() {
        let provider = Arc::new(MockProvider::echo(Arc::new(NoOpLogger)));
        let tools = Arc::new(MockToolProvider::new().with_tool(Tool::new("fresh", "New tool")));
        let chat = chat_loop(provider, tools, LoopConfig::default());

        assert_eq!(chat.registry().len(), 2);
        assert_eq!(chat.refresh_tools().await.unwrap(), 1);
        assert!(chat.registry().contains("fresh"));

        chat.replace_registry(vec![]);
        assert!(chat.registry().is_empty());
    }
}
