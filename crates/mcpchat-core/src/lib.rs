//! mcpchat core
//!
//! Wires a chat-completion model to an MCP tool server. The binary crate
//! only adds the console around what lives here.
//!
//! ## Tool-augmented chat
//!
//! The `chat` module runs one query through model and tool rounds until
//! the model answers:
//! - `tools` keeps the discovered tool set and invokes calls against it
//! - `mcp` connects to the tool server using the official rmcp SDK
//! - `providers` talks to the model through genai
//!
//! ```rust,ignore
//! use mcpchat_core::{ChatTurnLoop, LoopConfig, McpClient, ToolRegistry, CancellationToken};
//!
//! let mcp = Arc::new(McpClient::connect_stdio("mcp-server", &[], logger.clone()).await?);
//! let registry = Arc::new(ToolRegistry::new(logger.clone()));
//! registry.refresh(mcp.as_ref()).await?;
//!
//! let mut chat = ChatTurnLoop::new(provider, registry, mcp, "You are helpful.", LoopConfig::default(), logger);
//! let outcome = chat.process_query("What tools do you have?", &CancellationToken::new()).await?;
//! println!("{}", outcome.answer);
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod providers;
pub mod tools;
pub mod mcp;
pub mod chat;

// Re-export commonly used types
pub use types::{CancellationToken, Role, Tool, ToolCall, ToolCallResult, ToolParameter, Turn};

pub use logging::{ConsoleLogger, LogLevel, Logger, MemoryLogger, NoOpLogger, SharedLogger};

pub use config::{AppConfig, ConfigError, ConfigLoader, McpEndpoint};

pub use providers::{create_provider, GenaiProvider, MockProvider, Provider, ProviderError};

pub use tools::{ToolError, ToolInvoker, ToolOutput, ToolProvider, ToolRegistry};

// MCP client using official rmcp SDK
pub use mcp::{McpClient, McpError, McpResult};

pub use chat::{
    ChatError, ChatTurnLoop, Conversation, ConversationError, LoopConfig, LoopObserver, LoopState,
    LoopStats, QueryOutcome,
};
