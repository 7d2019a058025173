//! MCP (Model Context Protocol) client module
//!
//! Uses the official rmcp SDK to connect to MCP servers.
//! Supports child-process (stdio), HTTP and Unix socket transports.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpchat_core::mcp::McpClient;
//! use std::sync::Arc;
//!
//! let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
//!
//! // Spawn the server as a child process
//! let client = McpClient::connect_stdio("npx", &["-y".into(), "@modelcontextprotocol/server-everything".into()], logger).await?;
//!
//! // List available tools
//! let tools = client.list_tools().await?;
//!
//! // Call a tool
//! let mut arguments = serde_json::Map::new();
//! arguments.insert("message".to_string(), json!("hi"));
//! let result = client.call_tool("echo", arguments).await?;
//! ```

mod client;

pub use client::{tool_from_mcp, tool_output_from_result, McpClient, McpError, McpResult};

// Re-export rmcp types that consumers might need
pub use rmcp::model::{Tool as McpTool, CallToolResult as McpToolResult};
