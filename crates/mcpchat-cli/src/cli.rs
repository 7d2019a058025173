use clap::Parser;
use mcpchat_core::config::AppConfig;
use mcpchat_core::LogLevel;
use std::path::PathBuf;

/// Chat with an LLM that can call the tools of an MCP server
#[derive(Parser, Debug)]
#[command(name = "mcpchat", version, about, long_about = None)]
pub struct Args {
    /// Extra YAML config file, applied after the user and workspace files
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model provider (openai, anthropic, gemini, ollama, groq, deepseek, any OpenAI-compatible id, or mock)
    #[arg(short = 'p', long)]
    pub provider: Option<String>,

    /// Model name to use (provider-specific)
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// API base URL for the model provider
    #[arg(long)]
    pub api_base: Option<String>,

    /// Command line that starts the MCP server (spoken to over stdio)
    #[arg(long, conflicts_with = "mcp_url")]
    pub mcp_command: Option<String>,

    /// Streamable HTTP URL of the MCP server
    #[arg(long)]
    pub mcp_url: Option<String>,

    /// Tool rounds allowed per query
    #[arg(long)]
    pub max_tool_rounds: Option<u32>,

    /// Run the tool calls of one round concurrently
    #[arg(long)]
    pub parallel_tools: bool,

    /// Start with debug display on (timing, tool-call reports)
    #[arg(long)]
    pub debug: bool,

    /// Start with raw display on (request and response JSON)
    #[arg(long)]
    pub raw: bool,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Minimum log level (debug, info, warn, error); overrides -v
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl Args {
    /// Minimum level for the stderr logger
    pub fn log_level(&self) -> LogLevel {
        if let Some(level) = self.log_level {
            return level;
        }
        match self.verbose {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    /// Flags override every other configuration source
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(provider) = &self.provider {
            config.model.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.model.model_id = model.clone();
        }
        if let Some(api_base) = &self.api_base {
            config.model.api_base = Some(api_base.clone());
        }
        if let Some(command_line) = &self.mcp_command {
            let mut parts = command_line.split_whitespace().map(str::to_string);
            if let Some(command) = parts.next() {
                config.mcp.set_command(command, parts.collect());
            }
        }
        if let Some(url) = &self.mcp_url {
            config.mcp.set_url(url.clone());
        }
        if let Some(rounds) = self.max_tool_rounds {
            config.chat.max_tool_rounds = rounds;
        }
        if self.parallel_tools {
            config.chat.parallel_tool_calls = true;
        }
    }
}
