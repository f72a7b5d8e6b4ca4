//! Tool descriptor, call and result types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool as advertised by a provider's `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within one session's tool list
    pub name: String,
    /// Description of what the tool does
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object" })
}

impl ToolDescriptor {
    /// Create a descriptor that accepts any object
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Keys listed in the schema's `required` array
    pub fn required_keys(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Check call arguments against the schema's shape before dispatch
    ///
    /// A missing (`null`) argument value is treated as an empty object.
    /// Only the top-level type and the `required` keys are checked; deeper
    /// validation is left to the provider.
    pub fn validate_arguments(&self, arguments: &Value) -> Result<Value, String> {
        let arguments = match arguments {
            Value::Null => Value::Object(serde_json::Map::new()),
            Value::Object(_) => arguments.clone(),
            other => {
                return Err(format!(
                    "arguments for '{}' must be a JSON object, got {}",
                    self.name,
                    json_type_name(other)
                ))
            }
        };

        let missing: Vec<&str> = self
            .required_keys()
            .into_iter()
            .filter(|key| arguments.get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "missing required argument(s) for '{}': {}",
                self.name,
                missing.join(", ")
            ));
        }

        Ok(arguments)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Tool call requested by the completion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque identifier chosen by the completion service
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Arguments for the tool
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Tool result fed back to the completion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// Normalized text content
    pub content: String,
    /// Whether this result represents an error
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: error.into(),
            is_error: true,
        }
    }
}

/// Token accounting reported by the completion service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(rename = "promptTokens")]
    pub prompt_tokens: u32,
    #[serde(rename = "completionTokens")]
    pub completion_tokens: u32,
    #[serde(rename = "totalTokens")]
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Accumulate another round's usage into this one
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_keys() {
        let tool = ToolDescriptor::new("echo", "Echo a message").with_schema(json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"]
        }));
        assert_eq!(tool.required_keys(), vec!["message"]);

        let open = ToolDescriptor::new("ping", "No arguments");
        assert!(open.required_keys().is_empty());
    }

    #[test]
    fn test_validate_arguments() {
        let tool = ToolDescriptor::new("add", "Add two numbers").with_schema(json!({
            "type": "object",
            "required": ["a", "b"]
        }));

        assert_eq!(tool.validate_arguments(&json!({"a": 1, "b": 2})).unwrap()["b"], json!(2));

        let err = tool.validate_arguments(&json!({"a": 1})).unwrap_err();
        assert!(err.contains("missing required argument(s) for 'add': b"));

        let err = tool.validate_arguments(&json!("1 + 2")).unwrap_err();
        assert!(err.contains("must be a JSON object, got string"));

        let open = ToolDescriptor::new("ping", "");
        assert_eq!(open.validate_arguments(&Value::Null).unwrap(), json!({}));
    }

    #[test]
    fn test_descriptor_deserializes_without_schema() {
        let tool: ToolDescriptor = serde_json::from_value(json!({ "name": "ping" })).unwrap();
        assert_eq!(tool.input_schema, json!({ "type": "object" }));
        assert_eq!(tool.description, "");
    }

    #[test]
    fn test_tool_result_serialization() {
        let ok = serde_json::to_value(ToolResult::success("c1", "hi")).unwrap();
        assert_eq!(ok, json!({ "callId": "c1", "content": "hi" }));

        let err = serde_json::to_value(ToolResult::error("c2", "boom")).unwrap();
        assert_eq!(err["isError"], json!(true));
    }

    #[test]
    fn test_usage_accumulates() {
        let mut total = TokenUsage::default();
        total.add(TokenUsage::new(10, 5));
        total.add(TokenUsage::new(7, 3));
        assert_eq!(total, TokenUsage { prompt_tokens: 17, completion_tokens: 8, total_tokens: 25 });
    }
}
