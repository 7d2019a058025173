//! Tool registry for model tool calling
//!
//! The ToolRegistry holds the set of tools the model may call. It is filled
//! from a `ToolProvider` at startup and replaced wholesale on refresh:
//! readers always see either the old snapshot or the new one, never a mix.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;

use super::{ToolError, ToolProvider, ToolResult};
use crate::logging::Logger;
use crate::{log_error, log_info};
use crate::types::Tool;

/// Immutable view of the registry contents
#[derive(Debug, Default)]
struct Snapshot {
    /// Tools in order of first appearance
    tools: Vec<Tool>,
    /// Name -> index into `tools`
    index: HashMap<String, usize>,
}

impl Snapshot {
    fn build(tools: Vec<Tool>, logger: &dyn Logger) -> Self {
        let mut snapshot = Snapshot::default();
        for tool in tools {
            match snapshot.index.get(&tool.name) {
                Some(&pos) => {
                    logger.warn(&format!(
                        "[ToolRegistry] Duplicate tool name '{}', keeping the later definition",
                        tool.name
                    ));
                    snapshot.tools[pos] = tool;
                }
                None => {
                    snapshot.index.insert(tool.name.clone(), snapshot.tools.len());
                    snapshot.tools.push(tool);
                }
            }
        }
        snapshot
    }
}

/// Tool registry for managing available tools
pub struct ToolRegistry {
    /// Current snapshot; swapped, never mutated in place
    snapshot: RwLock<Arc<Snapshot>>,
    /// Logger
    logger: Arc<dyn Logger>,
}

impl ToolRegistry {
    /// Create an empty tool registry
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            logger,
        }
    }

    /// Create a registry holding `tools`
    pub fn with_tools(tools: Vec<Tool>, logger: Arc<dyn Logger>) -> Self {
        let registry = Self::new(logger);
        registry.replace(tools);
        registry
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Replace the whole tool set
    pub fn replace(&self, tools: Vec<Tool>) {
        let snapshot = Arc::new(Snapshot::build(tools, self.logger.as_ref()));
        let count = snapshot.tools.len();
        *self.snapshot.write() = snapshot;
        log_info!(self.logger, "[ToolRegistry] Registered {} tools", count);
    }

    /// Re-discover tools from `provider` and swap them in
    ///
    /// On failure the previous tool set stays in place.
    pub async fn refresh(&self, provider: &dyn ToolProvider) -> ToolResult<usize> {
        match provider.discover_tools().await {
            Ok(tools) => {
                self.logger.info(&format!(
                    "[ToolRegistry] Discovered {} tools from provider",
                    tools.len()
                ));
                self.replace(tools);
                Ok(self.len())
            }
            Err(e) => {
                log_error!(self.logger, "[ToolRegistry] Failed to fetch tools: {}", e);
                Err(e)
            }
        }
    }

    /// All tools, in order of first appearance
    pub fn list(&self) -> Vec<Tool> {
        self.current().tools.clone()
    }

    /// Look up a tool by exact name
    pub fn find(&self, name: &str) -> ToolResult<Tool> {
        let snapshot = self.current();
        snapshot
            .index
            .get(name)
            .map(|&pos| snapshot.tools[pos].clone())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.current().index.contains_key(name)
    }

    /// Get count of available tools
    pub fn len(&self) -> usize {
        self.current().tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
