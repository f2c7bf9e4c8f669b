use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

/// A mock tool in the catalog.
///
/// `mock_response` is either a text template (`"Hello {{who}}"`) or any
/// structured JSON value returned verbatim as text.
/// Config-sourced tools carry no timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_input_schema")]
    pub input_schema: Value,
    #[serde(default = "empty_mock_response")]
    pub mock_response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        mock_response: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            mock_response,
            created_at: None,
            updated_at: None,
        }
    }

    /// The `tools/list` view of this tool; the mock payload stays internal.
    pub fn summary(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

pub fn default_input_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

fn empty_mock_response() -> Value {
    Value::String(String::new())
}

pub fn default_mock_response() -> Value {
    json!({"text": "mock response"})
}

/// The tool shipped in the default configuration.
pub fn echo_tool() -> ToolDefinition {
    ToolDefinition::new(
        "echo",
        "Echo back the input message",
        json!({
            "type": "object",
            "properties": {"message": {"type": "string", "description": "Message to echo"}},
            "required": ["message"],
        }),
        Value::String("{{message}}".to_string()),
    )
}
