//! Environment variable configuration layer
//!
//! Accepts the short `.env` names (`API_KEY`,
//! `BaseURL`, `ModelID`, `MCPCommand`, `MCPArguments`) and `MCPCHAT_*`
//! names for everything. When both are set, the `MCPCHAT_*` name wins.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use once_cell::sync::Lazy;

use super::error::{ConfigError, ConfigResult};
use super::settings::AppConfig;

/// Setting key -> environment variable names, highest priority first
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("model.provider", vec!["MCPCHAT_PROVIDER"]);
    m.insert("model.model_id", vec!["MCPCHAT_MODEL", "ModelID"]);
    m.insert("model.api_base", vec!["MCPCHAT_API_BASE", "BaseURL"]);
    m.insert("model.api_key", vec!["MCPCHAT_API_KEY", "API_KEY"]);
    m.insert("model.temperature", vec!["MCPCHAT_TEMPERATURE"]);
    m.insert("model.max_tokens", vec!["MCPCHAT_MAX_TOKENS"]);
    m.insert("mcp.command", vec!["MCPCHAT_MCP_COMMAND", "MCPCommand"]);
    m.insert("mcp.args", vec!["MCPCHAT_MCP_ARGS", "MCPArguments"]);
    m.insert("mcp.url", vec!["MCPCHAT_MCP_URL"]);
    m.insert("mcp.socket", vec!["MCPCHAT_MCP_SOCKET"]);
    m.insert("mcp.call_timeout_secs", vec!["MCPCHAT_TOOL_TIMEOUT_SECS"]);
    m.insert("chat.system_prompt", vec!["MCPCHAT_SYSTEM_PROMPT"]);
    m.insert("chat.max_tool_rounds", vec!["MCPCHAT_MAX_TOOL_ROUNDS"]);
    m.insert("chat.parallel_tool_calls", vec!["MCPCHAT_PARALLEL_TOOLS"]);
    m
});

/// Environment variable names consulted for a setting key
pub fn env_vars_for(key: &str) -> Option<&'static [&'static str]> {
    ENV_VAR_MAP.get(key).map(|v| v.as_slice())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, format!("'{}': {}", value, e)))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("'{}' is not a boolean", other))),
    }
}

fn set(config: &mut AppConfig, key: &str, value: &str) -> ConfigResult<()> {
    match key {
        "model.provider" => config.model.provider = value.to_string(),
        "model.model_id" => config.model.model_id = value.to_string(),
        "model.api_base" => config.model.api_base = Some(value.to_string()),
        "model.api_key" => config.model.api_key = Some(value.to_string()),
        "model.temperature" => config.model.temperature = Some(parse(key, value)?),
        "model.max_tokens" => config.model.max_tokens = Some(parse(key, value)?),
        "mcp.command" => config.mcp.command = Some(value.to_string()),
        "mcp.args" => config.mcp.args = value.split_whitespace().map(str::to_string).collect(),
        "mcp.url" => config.mcp.url = Some(value.to_string()),
        "mcp.socket" => config.mcp.socket = Some(PathBuf::from(value)),
        "mcp.call_timeout_secs" => config.mcp.call_timeout_secs = Some(parse(key, value)?),
        "chat.system_prompt" => config.chat.system_prompt = value.to_string(),
        "chat.max_tool_rounds" => config.chat.max_tool_rounds = parse(key, value)?,
        "chat.parallel_tool_calls" => config.chat.parallel_tool_calls = parse_bool(key, value)?,
        other => return Err(ConfigError::Other(format!("unknown setting: {}", other))),
    }
    Ok(())
}

/// Apply variables found through `lookup` on top of `config`
///
/// Empty values count as unset.
pub fn apply_env_with<F>(config: &mut AppConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    // sorted so a bad value always reports the same key first
    let mut keys: Vec<&&str> = ENV_VAR_MAP.keys().collect();
    keys.sort();

    for key in keys {
        let value = ENV_VAR_MAP[*key]
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()));
        if let Some(value) = value {
            set(config, key, &value)?;
        }
    }
    Ok(())
}

/// Apply the process environment on top of `config`
pub fn apply_env(config: &mut AppConfig) -> ConfigResult<()> {
    apply_env_with(config, |name| env::var(name).ok())
}
