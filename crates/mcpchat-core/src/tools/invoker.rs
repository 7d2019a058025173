//! Tool invocation
//!
//! Turns model-requested tool calls into results. Every failure (unknown
//! tool, transport error, in-band tool error) becomes a failed
//! `ToolCallResult` so the model can see what went wrong and carry on.

use std::sync::Arc;

use futures::future::join_all;

use super::{ToolError, ToolProvider, ToolRegistry};
use crate::logging::{LogLevel, Logger};
use crate::types::{ToolCall, ToolCallResult};

/// Executes tool calls against a tool provider
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    provider: Arc<dyn ToolProvider>,
    logger: Arc<dyn Logger>,
}

impl ToolInvoker {
    pub fn new(
        registry: Arc<ToolRegistry>,
        provider: Arc<dyn ToolProvider>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            registry,
            provider,
            logger,
        }
    }

    /// Registry consulted before every call
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The provider calls are sent to
    pub fn provider(&self) -> &Arc<dyn ToolProvider> {
        &self.provider
    }

    /// Execute one call; never fails
    ///
    /// Unknown tools and calls whose arguments are not a JSON object are
    /// rejected without contacting the provider. Known tools get exactly one
    /// provider call.
    pub async fn invoke(&self, call: &ToolCall) -> ToolCallResult {
        if let Err(e) = self.registry.find(&call.tool_name) {
            self.logger.warn(&format!("[ToolInvoker] {}", e));
            return ToolCallResult::failure(&call.call_id, &call.tool_name, e.to_string());
        }

        if let Some(raw) = &call.raw_arguments {
            let message = format!("arguments must be a JSON object, got: {}", raw);
            self.logger.warn(&format!(
                "[ToolInvoker] Rejecting {} ({}): {}",
                call.tool_name, call.call_id, message
            ));
            return ToolCallResult::failure(&call.call_id, &call.tool_name, message);
        }

        self.logger.debug(&format!(
            "[ToolInvoker] Calling {} ({})",
            call.tool_name, call.call_id
        ));

        let (result, level) = match self.provider.call_tool(&call.tool_name, call.arguments.clone()).await {
            Ok(output) if output.is_error => (
                ToolCallResult::failure(&call.call_id, &call.tool_name, output.text),
                LogLevel::Warn,
            ),
            Ok(output) => (
                ToolCallResult::success(&call.call_id, &call.tool_name, output.text),
                LogLevel::Debug,
            ),
            Err(e) => {
                let message = match e {
                    ToolError::InvocationFailed(message) => message,
                    other => other.to_string(),
                };
                (
                    ToolCallResult::failure(&call.call_id, &call.tool_name, message),
                    LogLevel::Error,
                )
            }
        };

        self.logger.log(
            level,
            &format!(
                "[ToolInvoker] {} ({}) {}: {}",
                call.tool_name,
                call.call_id,
                if result.succeeded { "returned" } else { "failed" },
                result.error_message.as_deref().unwrap_or(&result.payload)
            ),
        );
        result
    }

    /// Execute all calls of one round
    ///
    /// Results come back in call order whether or not the calls ran
    /// concurrently.
    pub async fn invoke_round(&self, calls: &[ToolCall], parallel: bool) -> Vec<ToolCallResult> {
        if parallel {
            return join_all(calls.iter().map(|call| self.invoke(call))).await;
        }

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.invoke(call).await);
        }
        results
    }
}
