//! Adapter between mcpchat types and genai types
//!
//! genai owns the chat-completion wire protocol; this module only maps our
//! turns and tools onto its request types and its response back onto turns.

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatResponse, Tool as GenaiTool,
    ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse, Usage,
};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::webc::Error as WebcError;
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};
use serde_json::json;

use crate::types::{Role, Tool, ToolCall, Turn};

use super::error::{ProviderError, ProviderResult};
use super::traits::{Completion, CompletionOptions, ProviderModelConfig, TokenUsage};

// ============================================================================
// Turn Conversion: mcpchat -> genai
// ============================================================================

/// Convert our ToolCall to a genai ToolCall
pub fn to_genai_tool_call(call: &ToolCall) -> ProviderResult<GenaiToolCall> {
    let tool_call = serde_json::from_value(json!({
        "call_id": call.call_id,
        "fn_name": call.tool_name,
        "fn_arguments": call.arguments_value(),
    }))?;
    Ok(tool_call)
}

/// Convert one turn into the genai messages that represent it
///
/// A tool turn expands into one tool-response message per result, in result
/// order.
pub fn to_genai_messages_for_turn(turn: &Turn) -> ProviderResult<Vec<GenaiMessage>> {
    let text = turn.text.clone().unwrap_or_default();

    let messages = match turn.role {
        Role::System => vec![GenaiMessage::system(text)],
        Role::User => vec![GenaiMessage::user(text)],
        Role::Assistant if turn.tool_calls.is_empty() => vec![GenaiMessage::assistant(text)],
        Role::Assistant => {
            let calls = turn
                .tool_calls
                .iter()
                .map(to_genai_tool_call)
                .collect::<ProviderResult<Vec<_>>>()?;
            let mut messages = Vec::with_capacity(2);
            if !text.is_empty() {
                messages.push(GenaiMessage::assistant(text));
            }
            messages.push(GenaiMessage::from(calls));
            messages
        }
        Role::Tool => turn
            .tool_results
            .iter()
            .map(|r| GenaiMessage::from(GenaiToolResponse::new(r.call_id.clone(), r.payload.clone())))
            .collect(),
    };

    Ok(messages)
}

/// Convert a conversation to genai messages
pub fn to_genai_messages(turns: &[Turn]) -> ProviderResult<Vec<GenaiMessage>> {
    let mut messages = Vec::with_capacity(turns.len());
    for turn in turns {
        messages.extend(to_genai_messages_for_turn(turn)?);
    }
    Ok(messages)
}

// ============================================================================
// Tool Conversion: mcpchat -> genai
// ============================================================================

/// Convert our Tool to a genai Tool
pub fn to_genai_tool(tool: &Tool) -> GenaiTool {
    GenaiTool::new(&tool.name)
        .with_description(&tool.description)
        .with_schema(tool.input_schema.clone())
}

/// Convert a tool listing to genai tools
pub fn to_genai_tools(tools: &[Tool]) -> Vec<GenaiTool> {
    tools.iter().map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion: mcpchat -> genai
// ============================================================================

/// Convert CompletionOptions to genai ChatOptions
pub fn to_genai_options(options: &CompletionOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    genai_opts
}

// ============================================================================
// Response Conversion: genai -> mcpchat
// ============================================================================

/// Convert a genai ToolCall to our ToolCall
pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    ToolCall::new(tc.call_id.clone(), tc.fn_name.clone(), tc.fn_arguments.clone())
}

/// Convert a chat response into output turns
///
/// Every tool call in the response is kept, in response order. Text parts
/// are joined, so text on both sides of a tool call survives. A response
/// with neither text nor tool calls yields no turns.
pub fn from_genai_response(response: &ChatResponse) -> Vec<Turn> {
    let text = response.content.joined_texts().filter(|t| !t.is_empty());
    let tool_calls: Vec<ToolCall> = response
        .tool_calls()
        .into_iter()
        .map(from_genai_tool_call)
        .collect();

    match (text, tool_calls.is_empty()) {
        (None, true) => Vec::new(),
        (Some(text), true) => vec![Turn::assistant(text)],
        (text, false) => vec![Turn::assistant_with_calls(text, tool_calls)],
    }
}

/// Token usage, when the endpoint reported any counts
pub fn usage_from_genai(usage: &Usage) -> Option<TokenUsage> {
    if usage.prompt_tokens.is_none() && usage.completion_tokens.is_none() && usage.total_tokens.is_none() {
        return None;
    }

    let count = |n: Option<i32>| n.unwrap_or(0).max(0) as u64;
    let prompt_tokens = count(usage.prompt_tokens);
    let completion_tokens = count(usage.completion_tokens);
    let total_tokens = usage
        .total_tokens
        .map(|t| t.max(0) as u64)
        .unwrap_or(prompt_tokens + completion_tokens);

    Some(TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    })
}

/// Convert a chat response into a completion
pub fn completion_from_genai(response: &ChatResponse) -> Completion {
    Completion {
        turns: from_genai_response(response),
        usage: usage_from_genai(&response.usage),
    }
}

/// HTTP status carried by a genai error, if any
fn http_status(error: &genai::Error) -> Option<u16> {
    match error {
        genai::Error::HttpError { status, .. } => Some(status.as_u16()),
        genai::Error::WebModelCall { webc_error, .. } | genai::Error::WebAdapterCall { webc_error, .. } => {
            match webc_error {
                WebcError::ResponseFailedStatus { status, .. } => Some(status.as_u16()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Map a genai error onto a provider error, keeping the HTTP status when
/// the endpoint answered with one
pub fn error_from_genai(provider: &str, error: &genai::Error) -> ProviderError {
    match http_status(error) {
        Some(status) => ProviderError::api_error(provider, status, error.to_string()),
        None => ProviderError::request_failed(provider, error.to_string()),
    }
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// genai adapter used for a provider id; unknown ids are treated as
/// OpenAI-compatible endpoints
pub fn adapter_kind_for(provider: &str) -> AdapterKind {
    match provider.to_lowercase().as_str() {
        "anthropic" => AdapterKind::Anthropic,
        "gemini" | "google" => AdapterKind::Gemini,
        "ollama" => AdapterKind::Ollama,
        "groq" => AdapterKind::Groq,
        "xai" => AdapterKind::Xai,
        "deepseek" => AdapterKind::DeepSeek,
        "cohere" => AdapterKind::Cohere,
        _ => AdapterKind::OpenAI,
    }
}

/// Default API base URL for a provider id
pub fn default_api_base(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openai" => "https://api.openai.com/v1/",
        "anthropic" => "https://api.anthropic.com/v1/",
        "gemini" | "google" => "https://generativelanguage.googleapis.com/v1beta/",
        "ollama" => "http://localhost:11434/",
        "groq" => "https://api.groq.com/openai/v1/",
        "xai" => "https://api.x.ai/v1/",
        "deepseek" => "https://api.deepseek.com/",
        "cohere" => "https://api.cohere.com/v1/",
        "openrouter" => "https://openrouter.ai/api/v1/",
        "mistral" => "https://api.mistral.ai/v1/",
        _ => "https://api.openai.com/v1/",
    }
}

/// Environment variable holding the API key when none is configured
pub fn api_key_env_var(provider: &str) -> String {
    match provider.to_lowercase().as_str() {
        "gemini" | "google" => "GEMINI_API_KEY".to_string(),
        other => format!("{}_API_KEY", other.to_uppercase()),
    }
}

/// genai requires a trailing slash on endpoints
fn normalize_base(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

/// Create a genai Client pinned to one provider, endpoint and credential
///
/// genai would otherwise infer the adapter from the model name, which sends
/// unknown model ids (common behind OpenAI-compatible gateways) to the wrong
/// protocol.
pub fn create_client(provider: &str, model: &ProviderModelConfig) -> Client {
    let adapter_kind = adapter_kind_for(provider);
    let endpoint = normalize_base(
        model
            .api_base
            .as_deref()
            .unwrap_or_else(|| default_api_base(provider)),
    );
    let auth = match &model.api_key {
        Some(key) => AuthData::from_single(key.clone()),
        None => AuthData::from_env(api_key_env_var(provider)),
    };

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let model_name = target.model.model_name.clone();
            Ok(ServiceTarget {
                endpoint: Endpoint::from_owned(endpoint.clone()),
                auth: auth.clone(),
                model: ModelIden::new(adapter_kind, model_name),
            })
        },
    );

    Client::builder()
        .with_service_target_resolver(target_resolver)
        .build()
}
