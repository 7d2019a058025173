//! File-based configuration (YAML)
//!
//! Supports user-level (~/.config/mcpchat/config.yaml), workspace-level
//! (.config/mcpchat/config.yaml) and explicitly named config files.
//! Files are merged key by key, later files overriding earlier ones, before
//! the environment is applied on top.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::env::apply_env;
use super::error::{ConfigError, ConfigResult};
use super::settings::AppConfig;

/// Config level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/mcpchat/config.yaml)
    User,
    /// Workspace-level config (.config/mcpchat/config.yaml in the working directory)
    Workspace,
    /// A file named on the command line; must exist
    Explicit,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
            ConfigLevel::Explicit => "explicit",
        }
    }
}

/// One YAML config file
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    level: ConfigLevel,
}

impl ConfigFile {
    /// Create a config file reference for a specific path
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
        }
    }

    /// User-level config file
    pub fn user() -> Self {
        // XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("mcpchat").join("config.yaml"), ConfigLevel::User)
    }

    /// Workspace-level config file under `workspace_root`
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root.as_ref().join(".config").join("mcpchat").join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    /// A file the user named explicitly
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ConfigLevel::Explicit)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the file as a YAML tree
    ///
    /// A missing user or workspace file is `None`; a missing explicit file is
    /// an error.
    pub fn load(&self) -> ConfigResult<Option<Value>> {
        if !self.exists() {
            return match self.level {
                ConfigLevel::Explicit => Err(ConfigError::NotFound(self.path.display().to_string())),
                _ => Ok(None),
            };
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_yaml::from_str(&content).map_err(|e| ConfigError::Yaml {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(value))
    }
}

/// Merge `overlay` into `base`; mappings merge recursively, anything else replaces
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Resolves an `AppConfig` from layered sources
///
/// Source priority (later sources override earlier):
/// 1. files, in the order they were added
/// 2. environment variables (when enabled)
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    files: Vec<ConfigFile>,
    use_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// User file, then the workspace file under `workspace_root`, then the environment
    pub fn standard(workspace_root: impl AsRef<Path>) -> Self {
        Self::new()
            .with_file(ConfigFile::user())
            .with_file(ConfigFile::workspace(workspace_root))
            .with_env(true)
    }

    pub fn with_file(mut self, file: ConfigFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    /// Files that exist and will contribute
    pub fn present_files(&self) -> Vec<&ConfigFile> {
        self.files.iter().filter(|f| f.exists()).collect()
    }

    /// Resolve the configuration
    ///
    /// Does not validate; callers apply their own overrides first and then
    /// call `AppConfig::validate`.
    pub fn load(&self) -> ConfigResult<AppConfig> {
        let mut merged = Value::Mapping(Default::default());
        for file in &self.files {
            if let Some(value) = file.load()? {
                merge(&mut merged, value);
            }
        }

        let mut config: AppConfig = serde_yaml::from_value(merged).map_err(|e| ConfigError::Yaml {
            path: "merged configuration".to_string(),
            message: e.to_string(),
        })?;

        if self.use_env {
            apply_env(&mut config)?;
        }
        Ok(config)
    }
}
