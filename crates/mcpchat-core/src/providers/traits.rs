//! Provider trait definition

use std::ops::AddAssign;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::{Tool, Turn};
use super::error::ProviderResult;

/// Model configuration for provider requests
#[derive(Debug, Clone)]
pub struct ProviderModelConfig {
    /// Model identifier as used by the provider's API
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ProviderModelConfig {
    /// Create a new model config
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}

/// Sampling options applied to every completion
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

/// Token counts reported by the endpoint for one completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One model response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Output turns; may be empty
    pub turns: Vec<Turn>,
    /// Token usage, when the endpoint reported it
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self { turns, usage: None }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Model completion provider
///
/// Takes the whole conversation plus the tool listing and returns the
/// model's output turns with the reported token usage. No output turns is a
/// valid answer.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., "openai", "mock")
    fn name(&self) -> &str;

    /// Model identifier requests are sent to
    fn model_id(&self) -> &str;

    /// Endpoint requests are sent to, for display
    fn endpoint(&self) -> String;

    /// Ask the model for the next turns of `conversation`
    async fn complete(&self, conversation: &[Turn], tools: &[Tool]) -> ProviderResult<Completion>;
}
