//! Capability invocation and MCP integration.

pub mod errors;
mod host;
mod mcp_host;

pub use errors::ToolError;
pub use host::CapabilityHost;
pub use mcp_host::McpHost;

use serde_json::{Map, Value};

/// Arguments for a capability call: always a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(pub Map<String, Value>);

impl TryFrom<Value> for ToolArguments {
    type Error = ToolError;

    /// `null` means no arguments. A string is parsed as a JSON document.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            Value::String(raw) => {
                let parsed: Value = serde_json::from_str(&raw)
                    .map_err(|e| ToolError::InvalidInput(format!("arguments: {e}")))?;
                match parsed {
                    Value::String(_) => Err(ToolError::InvalidInput(
                        "arguments must be a JSON object, got string".into(),
                    )),
                    other => Self::try_from(other),
                }
            }
            other => Err(ToolError::InvalidInput(format!(
                "arguments must be a JSON object, got {}",
                kind(&other)
            ))),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
