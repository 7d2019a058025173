//! Core types for chat turns and tool calling
//!
//! This module contains all the shared types used by the providers,
//! the tool layer and the chat loop.

mod turn;
mod tool;
mod cancellation;

pub use turn::{Role, Turn};
pub use tool::{Tool, ToolCall, ToolCallResult, ToolParameter};
pub use cancellation::CancellationToken;
