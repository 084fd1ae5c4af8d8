//! Anthropic Messages API backend.

use crate::model::{
    Backend, InputSchema, Message, ModelError, ModelRequest, ModelResponse, Part, Role,
    StopReason, ToolSpec, ToolUse, Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ApiToolChoice>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: ApiInputSchema<'a>,
}

#[derive(Debug, Serialize)]
struct ApiInputSchema<'a> {
    #[serde(rename = "type")]
    schema_type: &'static str,
    properties: &'a Map<String, Value>,
    required: &'a [String],
}

#[derive(Debug, Serialize)]
struct ApiToolChoice {
    #[serde(rename = "type")]
    choice_type: &'static str,
    disable_parallel_tool_use: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
    url: String,
    parallel_tool_use: bool,
}

impl AnthropicBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            url: ANTHROPIC_API_URL.to_string(),
            parallel_tool_use: false,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the Messages API URL (proxies, gateways).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Allow the model to request several tool uses in one turn.
    pub fn parallel_tool_use(mut self, enabled: bool) -> Self {
        self.parallel_tool_use = enabled;
        self
    }

    pub fn build(self) -> AnthropicBackend {
        AnthropicBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            url: self.url,
            parallel_tool_use: self.parallel_tool_use,
        }
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    url: String,
    parallel_tool_use: bool,
}

impl AnthropicBackend {
    pub fn builder(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(api_key, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        let role = Self::role_to_api(msg.role);

        // Simple case: single text part
        if let [Part::Text(text)] = msg.parts.as_slice() {
            return ApiMessage {
                role,
                content: ApiContent::Text(text.clone()),
            };
        }

        let blocks = msg
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => ApiContentBlock::Text { text: text.clone() },
                Part::ToolUse(call) => ApiContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.input.clone(),
                },
                Part::ToolResult(result) => ApiContentBlock::ToolResult {
                    tool_use_id: result.tool_use_id.clone(),
                    content: result.content.clone(),
                    is_error: result.is_error,
                },
            })
            .collect();

        ApiMessage {
            role,
            content: ApiContent::Blocks(blocks),
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool<'_> {
        let InputSchema {
            properties,
            required,
        } = &spec.input_schema;
        ApiTool {
            name: &spec.name,
            description: &spec.description,
            input_schema: ApiInputSchema {
                schema_type: "object",
                properties,
                required,
            },
        }
    }

    fn build_request<'a>(&'a self, request: &ModelRequest<'a>) -> ApiRequest<'a> {
        let tools: Vec<ApiTool<'a>> = request.tools.iter().map(Self::tool_to_api).collect();
        let tool_choice = (!tools.is_empty()).then_some(ApiToolChoice {
            choice_type: "auto",
            disable_parallel_tool_use: !self.parallel_tool_use,
        });

        ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            system: request.system,
            tools,
            tool_choice,
        }
    }

    fn response_to_message(blocks: Vec<ApiResponseBlock>) -> Message {
        let parts: Vec<Part> = blocks
            .into_iter()
            .filter_map(|block| match block {
                ApiResponseBlock::Text { text } => Some(Part::Text(text)),
                ApiResponseBlock::ToolUse { id, name, input } => {
                    Some(Part::ToolUse(ToolUse { id, name, input }))
                }
                ApiResponseBlock::Unknown => None,
            })
            .collect();

        Message::from_parts(Role::Assistant, parts)
    }

    fn stop_reason(raw: Option<String>) -> StopReason {
        match raw.as_deref() {
            None | Some("end_turn") | Some("stop_sequence") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({})", self.model)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = self.build_request(&request);
        debug!(
            model = %self.model,
            messages = api_request.messages.len(),
            tools = api_request.tools.len(),
            "sending model request"
        );

        let response = self
            .client
            .post(&self.url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, body });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let message = Self::response_to_message(api_response.content);
        let usage = Usage {
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        };

        Ok(ModelResponse {
            message,
            usage,
            stop_reason: Self::stop_reason(api_response.stop_reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolResult;
    use serde_json::json;

    fn backend() -> AnthropicBackend {
        AnthropicBackend::builder("test-key", DEFAULT_MODEL).build()
    }

    #[test]
    fn backend_display() {
        assert_eq!(backend().to_string(), format!("anthropic({DEFAULT_MODEL})"));
    }

    #[test]
    fn single_text_message_uses_plain_content() {
        let api = AnthropicBackend::message_to_api(&Message::user("hi"));
        let value = serde_json::to_value(&api).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn tool_results_serialize_as_blocks() {
        let msg = Message::tool_results([
            ToolResult::success("toolu_1", "{\"status\":\"ok\"}"),
            ToolResult::error("toolu_2", "capability not found: delete_customer"),
        ]);
        let value = serde_json::to_value(AnthropicBackend::message_to_api(&msg)).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "tool_result", "tool_use_id": "toolu_1", "content": "{\"status\":\"ok\"}"},
                    {
                        "type": "tool_result",
                        "tool_use_id": "toolu_2",
                        "content": "capability not found: delete_customer",
                        "is_error": true
                    }
                ]
            })
        );
    }

    #[test]
    fn request_declares_tools_with_object_schema() {
        let mut properties = Map::new();
        properties.insert("name".into(), json!({"type": "string"}));
        let tools = vec![
            ToolSpec {
                name: "register_customer".into(),
                description: "Register a customer".into(),
                input_schema: InputSchema {
                    properties,
                    required: vec!["name".into()],
                },
            },
            ToolSpec {
                name: "customer_list".into(),
                description: "All customers".into(),
                input_schema: InputSchema::default(),
            },
        ];
        let messages = vec![Message::user("hello")];
        let backend = backend();
        let request = ModelRequest {
            messages: &messages,
            tools: &tools,
            system: Some("be brief"),
        };

        let value = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(value["system"], "be brief");
        assert_eq!(value["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(
            value["tools"][0]["input_schema"],
            json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]})
        );
        assert_eq!(
            value["tools"][1]["input_schema"],
            json!({"type": "object", "properties": {}, "required": []})
        );
        assert_eq!(
            value["tool_choice"],
            json!({"type": "auto", "disable_parallel_tool_use": true})
        );
    }

    #[test]
    fn request_without_tools_omits_tool_choice() {
        let messages = vec![Message::user("hello")];
        let backend = backend();
        let request = ModelRequest {
            messages: &messages,
            tools: &[],
            system: None,
        };
        let value = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
        assert!(value.get("system").is_none());
    }

    #[test]
    fn response_keeps_block_order_and_skips_unknown() {
        let raw = json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "text", "text": "Registering."},
                {"type": "tool_use", "id": "toolu_1", "name": "register_customer", "input": {"name": "Ada"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        let response: ApiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(
            AnthropicBackend::stop_reason(response.stop_reason),
            StopReason::ToolUse
        );

        let message = AnthropicBackend::response_to_message(response.content);
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.parts.len(), 2);
        assert_eq!(message.text(), "Registering.");
        assert_eq!(message.tool_uses()[0].input, json!({"name": "Ada"}));
    }
}
