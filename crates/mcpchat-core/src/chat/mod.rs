//! Conversation state and the tool-augmented chat-turn loop

mod error;
mod conversation;
mod turn_loop;

pub use error::{ChatError, ChatResult, ConversationError, ConversationResult};
pub use conversation::Conversation;
pub use turn_loop::{
    ChatTurnLoop, LoopConfig, LoopObserver, LoopState, LoopStats, NoopObserver, QueryOutcome,
};
