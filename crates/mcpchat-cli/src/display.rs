//! Plain line-oriented rendering for the console

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use mcpchat_core::chat::{Conversation, LoopObserver, LoopStats};
use mcpchat_core::providers::TokenUsage;
use mcpchat_core::{Provider, Role, Tool, ToolCall, ToolCallResult, Turn};
use serde_json::json;

/// Longest tool payload printed in a report
const MAX_PAYLOAD_CHARS: usize = 500;

/// Display switches toggled from the prompt
#[derive(Debug, Default)]
pub struct DisplayFlags {
    debug: AtomicBool,
    raw: AtomicBool,
}

impl DisplayFlags {
    pub fn new(debug: bool, raw: bool) -> Self {
        Self {
            debug: AtomicBool::new(debug),
            raw: AtomicBool::new(raw),
        }
    }

    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn raw(&self) -> bool {
        self.raw.load(Ordering::Relaxed)
    }

    /// Flip debug mode, returning the new value
    pub fn toggle_debug(&self) -> bool {
        !self.debug.fetch_xor(true, Ordering::Relaxed)
    }

    /// Flip raw mode, returning the new value
    pub fn toggle_raw(&self) -> bool {
        !self.raw.fetch_xor(true, Ordering::Relaxed)
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}... ({} chars)", &text[..cut], text.chars().count()),
        None => text.to_string(),
    }
}

fn format_arguments(call: &ToolCall) -> String {
    call.arguments
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_usage(usage: &TokenUsage) -> String {
    format!(
        "Tokens: prompt {}, completion {}, total {}",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    )
}

/// Prints loop events according to the display flags
pub struct ConsoleObserver {
    flags: Arc<DisplayFlags>,
    model_id: String,
}

impl ConsoleObserver {
    pub fn new(flags: Arc<DisplayFlags>, model_id: impl Into<String>) -> Self {
        Self {
            flags,
            model_id: model_id.into(),
        }
    }
}

impl LoopObserver for ConsoleObserver {
    fn on_model_request(&self, conversation: &[Turn], tools: &[Tool]) {
        if self.flags.raw() {
            let request = json!({ "messages": conversation, "tools": tools });
            println!("--- request ---");
            println!("{}", serde_json::to_string_pretty(&request).unwrap_or_default());
        }
        if self.flags.debug() {
            println!(
                "[{}] Sending {} turn(s) to {}...",
                timestamp(),
                conversation.len(),
                self.model_id
            );
        }
    }

    fn on_model_response(&self, turns: &[Turn], usage: Option<&TokenUsage>, latency: Duration) {
        if self.flags.raw() {
            let response = json!({ "turns": turns, "usage": usage });
            println!("--- response ---");
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
        }
        if self.flags.debug() {
            println!(
                "[{}] Response received in {:.2}s ({} turn(s))",
                timestamp(),
                latency.as_secs_f64(),
                turns.len()
            );
            if let Some(usage) = usage {
                println!("{}", format_usage(usage));
            }
            let calls: usize = turns.iter().map(|t| t.tool_calls.len()).sum();
            if calls == 0 {
                println!("No tool calls in this response");
            }
        }
    }

    fn on_tool_result(&self, call: &ToolCall, result: &ToolCallResult) {
        if self.flags.debug() {
            println!("Tool call: {}({})", call.tool_name, format_arguments(call));
            let status = if result.succeeded { "ok" } else { "failed" };
            println!("  -> {}: {}", status, truncate(&result.payload, MAX_PAYLOAD_CHARS));
        }
    }
}

/// Tool listing with parameters
pub fn render_tools(tools: &[Tool]) -> String {
    if tools.is_empty() {
        return "No tools available.".to_string();
    }

    let mut out = format!("Available tools ({}):\n", tools.len());
    for tool in tools {
        let _ = writeln!(out, "  {}: {}", tool.name, tool.description);
        for (name, param) in &tool.parameters {
            let required = if param.required { ", required" } else { "" };
            let _ = write!(out, "      - {} ({}{})", name, param.param_type, required);
            if param.description.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, ": {}", param.description);
            }
        }
    }
    out
}

/// Conversation history without the system prompt
pub fn render_history(conversation: &Conversation) -> String {
    if conversation.len() <= 1 {
        return "No conversation history.".to_string();
    }

    let mut out = String::new();
    for turn in &conversation.turns()[1..] {
        match turn.role {
            Role::User => {
                let _ = writeln!(out, "User: {}", turn.text().unwrap_or_default());
            }
            Role::Assistant => {
                if let Some(text) = turn.text() {
                    let _ = writeln!(out, "AI: {}", text);
                }
                for call in &turn.tool_calls {
                    let _ = writeln!(out, "AI -> {}({})", call.tool_name, format_arguments(call));
                }
            }
            Role::Tool => {
                for result in &turn.tool_results {
                    let _ = writeln!(
                        out,
                        "Tool ({}): {}",
                        result.tool_name,
                        truncate(&result.payload, MAX_PAYLOAD_CHARS)
                    );
                }
            }
            Role::System => {}
        }
        out.push_str("----------------------------------------\n");
    }
    out
}

pub fn render_model_info(provider: &dyn Provider) -> String {
    format!(
        "Provider: {}\nModel:    {}\nEndpoint: {}",
        provider.name(),
        provider.model_id(),
        provider.endpoint()
    )
}

pub fn render_stats(stats: &LoopStats, conversation: &Conversation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Queries:        {} ({} failed)", stats.queries, stats.failed_queries);
    let _ = writeln!(out, "Model requests: {}", stats.model_calls);
    let _ = writeln!(out, "Tool calls:     {}", stats.tool_calls);
    if let Some(last) = stats.last_model_latency {
        let _ = writeln!(out, "Last request:   {:.2}s", last.as_secs_f64());
    }
    if stats.model_calls > 0 {
        let avg = stats.total_model_latency.as_secs_f64() / stats.model_calls as f64;
        let _ = writeln!(out, "Avg request:    {:.2}s", avg);
    }
    if let Some(last) = &stats.last_usage {
        let _ = writeln!(out, "Last usage:     {}", format_usage(last));
        let total = &stats.total_usage;
        let _ = writeln!(out, "Total usage:    {}", format_usage(total));
    }
    let _ = write!(out, "Turns:          {}", conversation.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpchat_core::{MockProvider, NoOpLogger};
    use serde_json::json;

    #[test]
    fn test_flags_toggle() {
        let flags = DisplayFlags::new(false, true);
        assert!(flags.toggle_debug());
        assert!(flags.debug());
        assert!(!flags.toggle_raw());
        assert!(!flags.raw());
    }

    #[test]
    fn test_render_tools() {
        let tool = Tool::new("add", "Add numbers").with_schema(json!({
            "type": "object",
            "properties": { "a": { "type": "number", "description": "first" } },
            "required": ["a"]
        }));
        let out = render_tools(&[tool]);
        assert!(out.contains("add: Add numbers"));
        assert!(out.contains("- a (number, required): first"));
        assert_eq!(render_tools(&[]), "No tools available.");
    }

    #[test]
    fn test_render_history() {
        let mut conversation = Conversation::new("sys");
        assert_eq!(render_history(&conversation), "No conversation history.");

        conversation.append(Turn::user("add 1 and 2")).unwrap();
        conversation
            .append_round(
                Turn::assistant_with_calls(None, vec![ToolCall::new("c1", "add", json!({"a": 1, "b": 2}))]),
                Turn::tool_results(vec![ToolCallResult::success("c1", "add", "3")]),
            )
            .unwrap();
        conversation.append(Turn::assistant("It is 3")).unwrap();

        let out = render_history(&conversation);
        assert!(out.contains("User: add 1 and 2"));
        assert!(out.contains("AI -> add(a=1, b=2)"));
        assert!(out.contains("Tool (add): 3"));
        assert!(out.contains("AI: It is 3"));
        assert!(!out.contains("sys"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc... (6 chars)");
    }

    #[test]
    fn test_model_info_and_stats() {
        let provider = MockProvider::echo(Arc::new(NoOpLogger));
        assert!(render_model_info(&provider).contains("Model:    mock-echo"));

        let stats = LoopStats {
            queries: 2,
            model_calls: 4,
            total_model_latency: Duration::from_secs(2),
            ..Default::default()
        };
        let out = render_stats(&stats, &Conversation::new("sys"));
        assert!(out.contains("Model requests: 4"));
        assert!(out.contains("Avg request:    0.50s"));
        assert!(!out.contains("usage"));
    }

    #[test]
    fn test_stats_show_token_totals() {
        let stats = LoopStats {
            model_calls: 2,
            last_usage: Some(TokenUsage::new(30, 5)),
            total_usage: TokenUsage::new(50, 12),
            ..Default::default()
        };
        let out = render_stats(&stats, &Conversation::new("sys"));
        assert!(out.contains("Last usage:     Tokens: prompt 30, completion 5, total 35"));
        assert!(out.contains("Total usage:    Tokens: prompt 50, completion 12, total 62"));
    }
}
