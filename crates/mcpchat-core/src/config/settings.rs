//! Application settings
//!
//! `AppConfig` is the fully resolved configuration. Every field has a
//! default, so a YAML file only needs the keys it wants to change.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::providers::{CompletionOptions, ProviderModelConfig};

/// System prompt used when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant, helping us test MCP server functionality.";

/// Tool rounds allowed per query when none is configured
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

/// Model endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider id ("openai", "anthropic", "ollama", ... or "mock")
    pub provider: String,
    /// Model name sent to the provider
    pub model_id: String,
    /// Custom API base URL (OpenAI-compatible gateways, local servers)
    pub api_base: Option<String>,
    /// API key; falls back to the provider's usual env var when unset
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model_id: "gpt-4o-mini".to_string(),
            api_base: None,
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ModelSettings {
    pub fn is_mock(&self) -> bool {
        self.provider.eq_ignore_ascii_case("mock")
    }

    /// Model, credential and endpoint for the provider layer
    pub fn provider_model_config(&self) -> ProviderModelConfig {
        let mut config = ProviderModelConfig::new(&self.model_id);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key);
        }
        if let Some(base) = &self.api_base {
            config = config.with_api_base(base);
        }
        config
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// How to reach the MCP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpEndpoint {
    /// Spawn a child process and speak MCP over its stdio
    Stdio { command: String, args: Vec<String> },
    /// Streamable HTTP endpoint
    Http(String),
    /// Unix domain socket
    Unix(PathBuf),
}

impl std::fmt::Display for McpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            McpEndpoint::Stdio { command, args } if args.is_empty() => write!(f, "stdio: {}", command),
            McpEndpoint::Stdio { command, args } => write!(f, "stdio: {} {}", command, args.join(" ")),
            McpEndpoint::Http(url) => write!(f, "http: {}", url),
            McpEndpoint::Unix(path) => write!(f, "unix: {}", path.display()),
        }
    }
}

/// MCP server settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    /// Server executable
    pub command: Option<String>,
    /// Arguments for `command`
    pub args: Vec<String>,
    /// Streamable HTTP URL
    pub url: Option<String>,
    /// Unix socket path
    pub socket: Option<PathBuf>,
    /// Upper bound for one tool call; unbounded when unset
    pub call_timeout_secs: Option<u64>,
}

impl McpSettings {
    /// The endpoint to connect to; `command` wins over `url`, which wins over `socket`
    pub fn endpoint(&self) -> Option<McpEndpoint> {
        if let Some(command) = self.command.as_ref().filter(|c| !c.trim().is_empty()) {
            return Some(McpEndpoint::Stdio {
                command: command.clone(),
                args: self.args.clone(),
            });
        }
        if let Some(url) = self.url.as_ref().filter(|u| !u.trim().is_empty()) {
            return Some(McpEndpoint::Http(url.clone()));
        }
        self.socket.clone().map(McpEndpoint::Unix)
    }

    /// Use a child process, dropping any other endpoint
    pub fn set_command(&mut self, command: impl Into<String>, args: Vec<String>) {
        self.command = Some(command.into());
        self.args = args;
        self.url = None;
        self.socket = None;
    }

    /// Use an HTTP endpoint, dropping any other endpoint
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.command = None;
        self.args.clear();
        self.url = Some(url.into());
        self.socket = None;
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }
}

/// Chat loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub system_prompt: String,
    /// Tool rounds allowed per query
    pub max_tool_rounds: u32,
    /// Run the calls of one round concurrently
    pub parallel_tool_calls: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            parallel_tool_calls: false,
        }
    }
}

/// Fully resolved application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub mcp: McpSettings,
    pub chat: ChatSettings,
}

impl AppConfig {
    /// Check the settings can actually run a chat session
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chat.max_tool_rounds == 0 {
            return Err(ConfigError::invalid(
                "chat.max_tool_rounds",
                "must be at least 1",
            ));
        }
        if self.model.provider.trim().is_empty() {
            return Err(ConfigError::invalid("model.provider", "must not be empty"));
        }
        if !self.model.is_mock() && self.model.model_id.trim().is_empty() {
            return Err(ConfigError::invalid("model.model_id", "must not be empty"));
        }
        if self.mcp.endpoint().is_none() {
            return Err(ConfigError::MissingMcpEndpoint);
        }
        Ok(())
    }
}
