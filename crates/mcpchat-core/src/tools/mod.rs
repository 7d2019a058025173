//! Tool management module
//!
//! This module provides tool discovery and invocation for model tool
//! calling. It sits between the chat loop and whatever serves the tools
//! (normally an MCP server).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ChatTurnLoop                               │
//! │    - offers registry.list() to the model    │
//! │    - hands each requested call to invoker   │
//! └─────────────────────────────────────────────┘
//!           │                     │
//!           ▼                     ▼
//! ┌──────────────────┐  ┌──────────────────────┐
//! │  ToolRegistry    │  │  ToolInvoker         │
//! │  snapshot swap   │  │  soft failures       │
//! └──────────────────┘  └──────────────────────┘
//!           │                     │
//!           │ discover_tools      │ call_tool
//!           ▼                     ▼
//! ┌─────────────────────────────────────────────┐
//! │  ToolProvider (McpClient, MockToolProvider) │
//! └─────────────────────────────────────────────┘
//! ```

mod registry;
mod invoker;
mod mock;

pub use registry::ToolRegistry;
pub use invoker::ToolInvoker;
pub use mock::{MockToolProvider, MockToolReply};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::Tool;

/// Tool-layer errors
///
/// These never escape a chat query; the invoker folds them into a failed
/// `ToolCallResult` the model can read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool invocation failed: {0}")]
    InvocationFailed(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// What a tool provider returned for one call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text produced by the tool
    pub text: String,
    /// The tool reported failure in-band
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Source of callable tools
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Discover the tools currently offered
    async fn discover_tools(&self) -> ToolResult<Vec<Tool>>;

    /// Invoke one tool by name
    ///
    /// Transport and protocol failures are `Err`; a tool that ran and
    /// reported an error comes back as `Ok` with `is_error` set.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult<ToolOutput>;
}
