//! Tool/function calling types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One parameter of a tool, as described by its JSON schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// JSON type name ("string", "number", ...), "any" when the schema omits it
    #[serde(rename = "type")]
    pub param_type: String,
    /// Parameter description
    #[serde(default)]
    pub description: String,
    /// Whether the schema lists this parameter as required
    #[serde(default)]
    pub required: bool,
}

/// Tool definition discovered from a tool provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name, unique within a registry
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// Parameters keyed by name
    #[serde(default)]
    pub parameters: BTreeMap<String, ToolParameter>,
    /// Raw JSON Schema for the input, forwarded to the model as-is
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl Tool {
    /// Create a tool definition with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    /// Set the input schema and derive the parameter table from it
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.parameters = parameters_from_schema(&schema);
        self.input_schema = schema;
        self
    }

    /// Names of the required parameters, in name order
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|(_, p)| p.required)
            .map(|(name, _)| name.as_str())
    }
}

/// Build the parameter table from an object schema's `properties` and `required`
fn parameters_from_schema(schema: &Value) -> BTreeMap<String, ToolParameter> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    properties
        .iter()
        .map(|(name, prop)| {
            let param_type = match prop.get("type") {
                Some(Value::String(t)) => t.clone(),
                // e.g. ["string", "null"]
                Some(Value::Array(types)) => types
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("|"),
                _ => "any".to_string(),
            };
            let description = prop
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let param = ToolParameter {
                param_type,
                description,
                required: required.contains(&name.as_str()),
            };
            (name.clone(), param)
        })
        .collect()
}

/// Tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    #[serde(rename = "callId")]
    pub call_id: String,
    /// Name of the tool being called
    #[serde(rename = "toolName")]
    pub tool_name: String,
    /// Arguments for the tool
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Input exactly as the model sent it, when it was not an argument object
    #[serde(rename = "rawArguments", default, skip_serializing_if = "Option::is_none")]
    pub raw_arguments: Option<Value>,
}

impl ToolCall {
    /// Create a new tool call
    ///
    /// An object is taken as the argument map and `null` as no arguments. A
    /// string holding a JSON object is parsed. Anything else is kept in
    /// `raw_arguments` with an empty map, and the call cannot be invoked.
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, input: Value) -> Self {
        let (arguments, raw_arguments) = match input {
            Value::Object(map) => (map, None),
            Value::Null => (Map::new(), None),
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => (map, None),
                _ => (Map::new(), Some(Value::String(text))),
            },
            other => (Map::new(), Some(other)),
        };
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
            raw_arguments,
        }
    }

    /// The arguments as sent back to the model
    ///
    /// Unusable input is replayed as the model sent it.
    pub fn arguments_value(&self) -> Value {
        match &self.raw_arguments {
            Some(raw) => raw.clone(),
            None => Value::Object(self.arguments.clone()),
        }
    }

    /// Whether the model sent an argument object
    pub fn has_valid_arguments(&self) -> bool {
        self.raw_arguments.is_none()
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// Get an argument as a string
    pub fn get_arg_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// Outcome of one tool invocation, fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// Name of the tool that was called
    #[serde(rename = "toolName")]
    pub tool_name: String,
    /// Whether the call succeeded
    pub succeeded: bool,
    /// Text sent back to the model
    pub payload: String,
    /// Error description for failed calls
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ToolCallResult {
    /// Create a successful result
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            succeeded: true,
            payload: payload.into(),
            error_message: None,
        }
    }

    /// Create a failed result; the model sees the error text as the payload
    pub fn failure(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            succeeded: false,
            payload: format!("Error: {}", error),
            error_message: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_schema_parameters() {
        let tool = Tool::new("get_weather", "Get the current weather").with_schema(json!({
            "type": "object",
            "properties": {
                "location": { "type": "string", "description": "City name" },
                "units": { "type": ["string", "null"] },
                "days": {}
            },
            "required": ["location"]
        }));

        assert_eq!(tool.parameters.len(), 3);
        let location = &tool.parameters["location"];
        assert_eq!(location.param_type, "string");
        assert_eq!(location.description, "City name");
        assert!(location.required);
        assert_eq!(tool.parameters["units"].param_type, "string|null");
        assert_eq!(tool.parameters["days"].param_type, "any");
        assert_eq!(tool.required_parameters().collect::<Vec<_>>(), vec!["location"]);
    }

    #[test]
    fn test_tool_without_properties() {
        let tool = Tool::new("ping", "Ping").with_schema(json!({ "type": "object" }));
        assert!(tool.parameters.is_empty());
    }

    #[test]
    fn test_tool_call_args() {
        let call = ToolCall::new(
            "call_123",
            "get_weather",
            json!({
                "location": "San Francisco",
                "units": "celsius"
            }),
        );

        assert_eq!(call.get_arg_str("location"), Some("San Francisco"));
        assert_eq!(call.get_arg_str("units"), Some("celsius"));
        assert_eq!(call.get_arg_str("nonexistent"), None);
    }

    #[test]
    fn test_tool_call_null_input() {
        let call = ToolCall::new("call_1", "ping", Value::Null);
        assert!(call.arguments.is_empty());
        assert!(call.has_valid_arguments());
        assert_eq!(call.arguments_value(), json!({}));
    }

    #[test]
    fn test_tool_call_string_input_is_parsed() {
        let call = ToolCall::new("call_1", "echo", json!("{\"message\": \"hi\"}"));
        assert!(call.has_valid_arguments());
        assert_eq!(call.get_arg_str("message"), Some("hi"));
    }

    #[test]
    fn test_tool_call_unusable_input_is_kept() {
        let broken = json!("{\"message\": \"hi\"");
        let call = ToolCall::new("call_1", "echo", broken.clone());
        assert!(!call.has_valid_arguments());
        assert!(call.arguments.is_empty());
        assert_eq!(call.arguments_value(), broken);

        let list = ToolCall::new("call_2", "echo", json!([1, 2]));
        assert_eq!(list.raw_arguments, Some(json!([1, 2])));
    }

    #[test]
    fn test_tool_call_result() {
        let success = ToolCallResult::success("call_123", "get_weather", "72F, sunny");
        assert!(success.succeeded);
        assert!(success.error_message.is_none());

        let failure = ToolCallResult::failure("call_456", "get_weather", "Location not found");
        assert!(!failure.succeeded);
        assert_eq!(failure.payload, "Error: Location not found");
        assert_eq!(failure.error_message.as_deref(), Some("Location not found"));
    }
}
