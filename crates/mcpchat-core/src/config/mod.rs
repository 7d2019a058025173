//! Configuration
//!
//! Settings are resolved from layered sources:
//! - YAML files (user level, then workspace level, then an explicit file)
//! - environment variables
//! - command line flags, applied by the binary on the returned `AppConfig`

mod error;
mod settings;
mod file;
mod env;

pub use error::{ConfigError, ConfigResult};
pub use settings::{
    AppConfig, ChatSettings, McpEndpoint, McpSettings, ModelSettings, DEFAULT_MAX_TOOL_ROUNDS,
    DEFAULT_SYSTEM_PROMPT,
};
pub use file::{ConfigFile, ConfigLevel, ConfigLoader};
pub use env::{apply_env, apply_env_with, env_vars_for};
