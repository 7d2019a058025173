//! Conversation turn types

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolCallResult};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// One entry in a conversation
///
/// `tool_calls` is only populated on assistant turns that request tool use,
/// `tool_results` only on tool turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// The role of the turn's author
    pub role: Role,
    /// Plain text content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Tool calls requested by the model
    #[serde(rename = "toolCalls", default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Results of the tool calls of the preceding assistant turn
    #[serde(rename = "toolResults", default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolCallResult>,
}

impl Turn {
    fn text_turn(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: Some(text.into()),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Create a system turn
    pub fn system(text: impl Into<String>) -> Self {
        Self::text_turn(Role::System, text)
    }

    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::text_turn(Role::User, text)
    }

    /// Create a plain assistant turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text_turn(Role::Assistant, text)
    }

    /// Create an assistant turn that requests tool calls
    pub fn assistant_with_calls(text: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.filter(|t| !t.is_empty()),
            tool_calls,
            tool_results: Vec::new(),
        }
    }

    /// Create a tool turn carrying all results of one round
    pub fn tool_results(results: Vec<ToolCallResult>) -> Self {
        Self {
            role: Role::Tool,
            text: None,
            tool_calls: Vec::new(),
            tool_results: results,
        }
    }

    /// Get the text content, if any
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Whether this turn asks for tool calls
    pub fn requests_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}
