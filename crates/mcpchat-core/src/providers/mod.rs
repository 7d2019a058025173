//! Model completion providers
//!
//! ## Architecture
//!
//! Real endpoints go through `GenaiProvider`, which delegates the
//! chat-completion wire protocol to the `genai` crate. Providers genai does
//! not know by name are treated as OpenAI-compatible endpoints at the
//! configured API base.
//!
//! The `MockProvider` is kept for testing and offline runs.

mod traits;
mod error;
mod genai_adapter;
mod genai_provider;
mod mock;

// Core traits and types
pub use traits::{Completion, CompletionOptions, Provider, ProviderModelConfig, TokenUsage};
pub use error::{ProviderError, ProviderResult};

pub use genai_provider::GenaiProvider;
pub use genai_adapter::{adapter_kind_for, default_api_base};

// Mock provider for testing
pub use mock::{MockMode, MockProvider, MockReply, MockRequest};

use crate::logging::Logger;
use std::sync::Arc;

/// Create a provider for the given provider ID
///
/// `mock` selects the echoing `MockProvider`; everything else goes through
/// `GenaiProvider`.
pub fn create_provider(
    provider_id: &str,
    model: ProviderModelConfig,
    options: CompletionOptions,
    logger: Arc<dyn Logger>,
) -> Arc<dyn Provider> {
    match provider_id.to_lowercase().as_str() {
        "mock" => Arc::new(MockProvider::echo(logger)),
        _ => Arc::new(GenaiProvider::new(provider_id, model, options, logger)),
    }
}
