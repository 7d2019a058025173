//! MCP Client using the official rmcp SDK
//!
//! Connects to MCP servers over a child process's stdio, HTTP or a Unix
//! socket, and exposes them to the chat loop as a `ToolProvider`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
        RawContent, Tool as McpTool,
    },
    service::RunningService,
    transport::{ConfigureCommandExt, TokioChildProcess},
    RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::process::Command;

#[cfg(unix)]
use std::path::Path;
#[cfg(unix)]
use tokio::net::UnixStream;

use crate::logging::Logger;
use crate::tools::{ToolError, ToolOutput, ToolProvider, ToolResult};
use crate::types::Tool;

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Tool call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type McpResult<T> = Result<T, McpError>;

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "mcpchat".to_string(),
            title: Some("MCP Chat".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// MCP client for one connected tool server
pub struct McpClient {
    /// The underlying rmcp running service
    client: RunningService<RoleClient, ClientInfo>,
    /// Upper bound for a single tool call
    call_timeout: Option<Duration>,
    /// Logger
    logger: Arc<dyn Logger>,
}

impl McpClient {
    fn from_service(client: RunningService<RoleClient, ClientInfo>, logger: Arc<dyn Logger>) -> Self {
        logger.info("[McpClient] Connected and initialized successfully");
        Self {
            client,
            call_timeout: None,
            logger,
        }
    }

    /// Spawn `command` and talk MCP over its stdin/stdout
    pub async fn connect_stdio(
        command: &str,
        args: &[String],
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        logger.info(&format!(
            "[McpClient] Spawning MCP server: {} {}",
            command,
            args.join(" ")
        ));

        let transport = TokioChildProcess::new(Command::new(command).configure(|cmd| {
            cmd.args(args);
        }))
        .map_err(|e| McpError::ConnectionFailed(format!("failed to spawn '{}': {}", command, e)))?;

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        Ok(Self::from_service(client, logger))
    }

    /// Connect to an MCP server over a Unix socket
    #[cfg(unix)]
    pub async fn connect_unix<P: AsRef<Path>>(
        socket_path: P,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        let path = socket_path.as_ref();
        logger.info(&format!("[McpClient] Connecting to Unix socket: {:?}", path));

        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        let client = client_info()
            .serve(stream)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        Ok(Self::from_service(client, logger))
    }

    /// Connect to an MCP server over HTTP (Streamable HTTP transport)
    pub async fn connect_http(url: &str, logger: Arc<dyn Logger>) -> McpResult<Self> {
        use rmcp::transport::StreamableHttpClientTransport;

        logger.info(&format!("[McpClient] Connecting to HTTP: {}", url));

        let transport = StreamableHttpClientTransport::from_uri(url);

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        Ok(Self::from_service(client, logger))
    }

    /// Bound every tool call by `timeout`
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// List all available tools
    pub async fn list_tools(&self) -> McpResult<Vec<McpTool>> {
        let result = self
            .client
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger.info(&format!(
            "[McpClient] Listed {} tools",
            result.tools.len()
        ));

        Ok(result.tools)
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> McpResult<CallToolResult> {
        self.logger.info(&format!("[McpClient] Calling tool: {}", name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: Some(arguments),
            task: None,
        };

        let call = self.client.call_tool(params);
        let result = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| McpError::Timeout(limit))?,
            None => call.await,
        };

        result.map_err(|e| McpError::ToolCallFailed(e.to_string()))
    }

    /// Get server info as "name version"
    pub fn server_info(&self) -> Option<String> {
        self.client
            .peer_info()
            .map(|info| format!("{} {}", info.server_info.name, info.server_info.version))
    }

    /// Close the connection
    pub async fn close(self) -> McpResult<()> {
        self.logger.info("[McpClient] Closing connection");
        self.client
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }
}

/// Convert an MCP tool listing entry into our tool definition
pub fn tool_from_mcp(tool: &McpTool) -> Tool {
    let description = tool.description.as_deref().unwrap_or_default();
    let schema = Value::Object(tool.input_schema.as_ref().clone());
    Tool::new(tool.name.to_string(), description).with_schema(schema)
}

/// Flatten a call result into the text the model will see
///
/// Text contents are joined with newlines; when there are none, the
/// structured content's JSON is used instead.
pub fn tool_output_from_result(result: &CallToolResult) -> ToolOutput {
    let texts: Vec<&str> = result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect();

    let text = match (texts.is_empty(), &result.structured_content) {
        (true, Some(structured)) => structured.to_string(),
        _ => texts.join("\n"),
    };

    ToolOutput {
        text,
        is_error: result.is_error.unwrap_or(false),
    }
}

#[async_trait]
impl ToolProvider for McpClient {
    async fn discover_tools(&self) -> ToolResult<Vec<Tool>> {
        let tools = self
            .list_tools()
            .await
            .map_err(|e| ToolError::InvocationFailed(e.to_string()))?;
        Ok(tools.iter().map(tool_from_mcp).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult<ToolOutput> {
        let result = McpClient::call_tool(self, name, arguments)
            .await
            .map_err(|e| ToolError::InvocationFailed(e.to_string()))?;
        Ok(tool_output_from_result(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_from_mcp() {
        let mcp_tool: McpTool = serde_json::from_value(json!({
            "name": "add",
            "description": "Add two numbers",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "a": { "type": "number", "description": "First" },
                    "b": { "type": "number" }
                },
                "required": ["a", "b"]
            }
        }))
        .unwrap();

        let tool = tool_from_mcp(&mcp_tool);
        assert_eq!(tool.name, "add");
        assert_eq!(tool.description, "Add two numbers");
        assert_eq!(tool.parameters.len(), 2);
        assert_eq!(tool.parameters["a"].description, "First");
        assert_eq!(tool.required_parameters().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_output_joins_text_contents() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "line one" },
                { "type": "text", "text": "line two" }
            ]
        }))
        .unwrap();

        let output = tool_output_from_result(&result);
        assert_eq!(output.text, "line one\nline two");
        assert!(!output.is_error);
    }

    #[test]
    fn test_output_falls_back_to_structured_content() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [],
            "structuredContent": { "sum": 3 }
        }))
        .unwrap();

        assert_eq!(tool_output_from_result(&result).text, r#"{"sum":3}"#);
    }

    #[test]
    fn test_output_carries_error_flag() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "division by zero" }],
            "isError": true
        }))
        .unwrap();

        let output = tool_output_from_result(&result);
        assert!(output.is_error);
        assert_eq!(output.text, "division by zero");
    }
}
