//! GenaiProvider - completion provider backed by the genai crate
//!
//! Handles OpenAI, Anthropic, Gemini, Ollama and any OpenAI-compatible
//! endpoint reachable through a custom API base.

use async_trait::async_trait;
use std::sync::Arc;

use genai::chat::ChatRequest;
use genai::Client;

use crate::logging::Logger;
use crate::types::{Tool, Turn};

use super::error::ProviderResult;
use super::genai_adapter::{
    completion_from_genai, create_client, default_api_base, error_from_genai, to_genai_messages,
    to_genai_options, to_genai_tools,
};
use super::traits::{Completion, CompletionOptions, Provider, ProviderModelConfig};

/// Completion provider using genai for all supported LLM APIs
pub struct GenaiProvider {
    /// Provider identifier
    provider_id: String,
    /// Model, credential and endpoint
    model: ProviderModelConfig,
    /// Sampling options
    options: CompletionOptions,
    /// Client pinned to the provider's endpoint
    client: Client,
    /// Logger for debug output
    logger: Arc<dyn Logger>,
}

impl GenaiProvider {
    /// Create a new GenaiProvider
    pub fn new(
        provider_id: impl Into<String>,
        model: ProviderModelConfig,
        options: CompletionOptions,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let provider_id = provider_id.into();
        let client = create_client(&provider_id, &model);
        Self {
            provider_id,
            model,
            options,
            client,
            logger,
        }
    }

    /// Strip a leading "<provider>/" from a model string
    ///
    /// ("openai/gpt-4" -> "gpt-4" for provider "openai"; gateway ids such as
    /// "meta-llama/llama-3" are left alone for other providers)
    pub fn extract_model_name<'a>(provider: &str, model: &'a str) -> &'a str {
        match model.split_once('/') {
            Some((prefix, name)) if prefix.eq_ignore_ascii_case(provider) => name,
            _ => model,
        }
    }
}

#[async_trait]
impl Provider for GenaiProvider {
    fn name(&self) -> &str {
        &self.provider_id
    }

    fn model_id(&self) -> &str {
        &self.model.model
    }

    fn endpoint(&self) -> String {
        self.model
            .api_base
            .clone()
            .unwrap_or_else(|| default_api_base(&self.provider_id).to_string())
    }

    async fn complete(&self, conversation: &[Turn], tools: &[Tool]) -> ProviderResult<Completion> {
        let model_name = Self::extract_model_name(&self.provider_id, &self.model.model);
        self.logger.info(&format!(
            "[GenaiProvider] complete called: provider={}, model={}, turns={}, tools={}",
            self.provider_id,
            model_name,
            conversation.len(),
            tools.len()
        ));

        let mut chat_req = ChatRequest::new(to_genai_messages(conversation)?);
        if !tools.is_empty() {
            chat_req = chat_req.with_tools(to_genai_tools(tools));
        }

        let genai_options = to_genai_options(&self.options);

        let response = self
            .client
            .exec_chat(model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| {
                self.logger.error(&format!("[GenaiProvider] Request failed: {}", e));
                error_from_genai(&self.provider_id, &e)
            })?;

        let completion = completion_from_genai(&response);
        self.logger.debug(&format!(
            "[GenaiProvider] Response converted to {} turn(s), usage {:?}",
            completion.turns.len(),
            completion.usage
        ));

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_extract_model_name() {
        assert_eq!(GenaiProvider::extract_model_name("openai", "openai/gpt-4"), "gpt-4");
        assert_eq!(
            GenaiProvider::extract_model_name("anthropic", "anthropic/claude-3-opus"),
            "claude-3-opus"
        );
        assert_eq!(GenaiProvider::extract_model_name("openai", "gpt-4"), "gpt-4");
        assert_eq!(
            GenaiProvider::extract_model_name("openrouter", "meta-llama/llama-3-70b"),
            "meta-llama/llama-3-70b"
        );
    }

    #[test]
    fn test_endpoint_display() {
        let provider = GenaiProvider::new(
            "openai",
            ProviderModelConfig::new("gpt-4o-mini"),
            CompletionOptions::default(),
            Arc::new(NoOpLogger),
        );
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model_id(), "gpt-4o-mini");
        assert_eq!(provider.endpoint(), "https://api.openai.com/v1/");

        let custom = GenaiProvider::new(
            "qwen",
            ProviderModelConfig::new("qwen-plus").with_api_base("http://localhost:8000/v1"),
            CompletionOptions::default(),
            Arc::new(NoOpLogger),
        );
        assert_eq!(custom.endpoint(), "http://localhost:8000/v1");
    }
}
