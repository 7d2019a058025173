//! Conversation state
//!
//! An ordered list of turns that starts with exactly one system turn.
//! Turns are only ever appended; `reset` is the one way back.

use std::collections::HashSet;

use super::error::{ConversationError, ConversationResult};
use crate::types::{Role, ToolCall, Turn};

/// Ordered turns of one chat session
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Start a conversation with the given system prompt
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.turns[0].text().unwrap_or_default()
    }

    /// All turns, system turn first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Owned copy of the turns, for handing to a provider
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: the system turn cannot be removed
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Append one turn
    ///
    /// Leaves the conversation unchanged when the turn is rejected.
    pub fn append(&mut self, turn: Turn) -> ConversationResult<()> {
        validate_next(self.turns.last(), &turn)?;
        self.turns.push(turn);
        Ok(())
    }

    /// Append an assistant turn with tool calls together with its results
    ///
    /// Both turns are checked before either is added.
    pub fn append_round(&mut self, assistant: Turn, results: Turn) -> ConversationResult<()> {
        validate_next(self.turns.last(), &assistant)?;
        validate_next(Some(&assistant), &results)?;
        self.turns.push(assistant);
        self.turns.push(results);
        Ok(())
    }

    /// Drop everything but the system turn
    pub fn reset(&mut self) {
        self.turns.truncate(1);
    }
}

/// Check that `turn` may follow `previous`
fn validate_next(previous: Option<&Turn>, turn: &Turn) -> ConversationResult<()> {
    let pending: &[ToolCall] = match previous {
        Some(prev) if prev.requests_tools() => prev.tool_calls.as_slice(),
        _ => &[],
    };

    match turn.role {
        Role::System => Err(ConversationError::DuplicateSystemTurn),
        Role::Tool => validate_results(pending, turn),
        _ if !pending.is_empty() => Err(ConversationError::PendingToolResults(
            pending.iter().map(|c| c.call_id.clone()).collect(),
        )),
        Role::User if !turn.tool_calls.is_empty() || !turn.tool_results.is_empty() => {
            Err(malformed(turn, "user turns carry text only"))
        }
        Role::Assistant => {
            if !turn.tool_results.is_empty() {
                return Err(malformed(turn, "assistant turns cannot carry tool results"));
            }
            let mut seen = HashSet::new();
            for call in &turn.tool_calls {
                if !seen.insert(call.call_id.as_str()) {
                    return Err(ConversationError::DuplicateCallId(call.call_id.clone()));
                }
            }
            Ok(())
        }
        Role::User => Ok(()),
    }
}

/// Every result must answer one of `pending`, and every pending call must be answered once
fn validate_results(pending: &[ToolCall], turn: &Turn) -> ConversationResult<()> {
    if pending.is_empty() {
        return Err(ConversationError::UnexpectedToolTurn);
    }
    if !turn.tool_calls.is_empty() {
        return Err(malformed(turn, "tool turns cannot request tool calls"));
    }

    let mut answered = HashSet::new();
    for result in &turn.tool_results {
        if !pending.iter().any(|c| c.call_id == result.call_id) {
            return Err(ConversationError::UnknownCallId(result.call_id.clone()));
        }
        if !answered.insert(result.call_id.as_str()) {
            return Err(ConversationError::DuplicateCallId(result.call_id.clone()));
        }
    }

    let missing: Vec<String> = pending
        .iter()
        .filter(|c| !answered.contains(c.call_id.as_str()))
        .map(|c| c.call_id.clone())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConversationError::PendingToolResults(missing))
    }
}

fn malformed(turn: &Turn, reason: &str) -> ConversationError {
    ConversationError::MalformedTurn {
        role: turn.role.to_string(),
        reason: reason.to_string(),
    }
}
