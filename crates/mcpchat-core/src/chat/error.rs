//! Chat loop and conversation errors

use thiserror::Error;

use crate::providers::ProviderError;

/// A turn that would break the conversation's shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversationError {
    #[error("conversation already has a system turn")]
    DuplicateSystemTurn,

    #[error("tool turn does not follow an assistant turn with tool calls")]
    UnexpectedToolTurn,

    #[error("tool calls {0:?} are still waiting for results")]
    PendingToolResults(Vec<String>),

    #[error("tool result for unknown call id '{0}'")]
    UnknownCallId(String),

    #[error("call id '{0}' appears more than once")]
    DuplicateCallId(String),

    #[error("{role} turn is malformed: {reason}")]
    MalformedTurn { role: String, reason: String },
}

pub type ConversationResult<T> = Result<T, ConversationError>;

/// Why a query did not produce an answer
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("model unavailable: {0}")]
    ModelUnavailable(#[from] ProviderError),

    #[error("model still requested tools after {max_rounds} rounds")]
    ToolLoopExceeded { max_rounds: u32 },

    #[error("query cancelled")]
    Cancelled,

    #[error("conversation error: {0}")]
    Conversation(#[from] ConversationError),
}

pub type ChatResult<T> = Result<T, ChatError>;
