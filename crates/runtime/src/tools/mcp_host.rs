//! MCP-backed capability host.

use std::time::Duration;

use mcp::{Endpoint, Implementation, Resource, Session, Tool};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::info;

use super::{CapabilityHost, ToolError};
use crate::catalog::{CapabilityEntry, CapabilityKind};
use crate::model::InputSchema;

/// Capability host backed by a single MCP session.
pub struct McpHost {
    session: Session,
}

impl McpHost {
    /// Connect to the server and complete the handshake.
    pub async fn connect(endpoint: Endpoint) -> mcp::Result<Self> {
        Ok(Self {
            session: Session::connect(endpoint).await?,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn server_info(&self) -> &Implementation {
        self.session.server_info()
    }

    pub fn supports_tools(&self) -> bool {
        self.session.supports_tools()
    }

    pub fn supports_resources(&self) -> bool {
        self.session.supports_resources()
    }

    /// Log server notifications in the background until the session ends.
    ///
    /// Returns `None` if the listener was already started.
    pub fn spawn_notification_listener(&self) -> Option<JoinHandle<()>> {
        let mut notifications = self.session.take_notifications()?;
        Some(tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                info!(method = %notification.method, "received notification");
            }
        }))
    }
}

impl From<Tool> for CapabilityEntry {
    fn from(tool: Tool) -> Self {
        let schema = &tool.input_schema;
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
            kind: CapabilityKind::Tool {
                schema: InputSchema {
                    properties,
                    required,
                },
            },
        }
    }
}

impl From<Resource> for CapabilityEntry {
    fn from(resource: Resource) -> Self {
        let resource = resource.raw;
        Self {
            name: resource.name,
            description: resource.description.unwrap_or_default(),
            kind: CapabilityKind::Resource { uri: resource.uri },
        }
    }
}

impl CapabilityHost for McpHost {
    async fn list_tools(&self) -> Result<Vec<CapabilityEntry>, ToolError> {
        let tools = self.session.list_tools().await?;
        Ok(tools.into_iter().map(CapabilityEntry::from).collect())
    }

    async fn list_resources(&self) -> Result<Vec<CapabilityEntry>, ToolError> {
        let resources = self.session.list_resources().await?;
        Ok(resources.into_iter().map(CapabilityEntry::from).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Value, ToolError> {
        Ok(self
            .session
            .call_tool(name, Some(arguments), timeout)
            .await?)
    }

    async fn read_resource(&self, uri: &str, timeout: Duration) -> Result<Value, ToolError> {
        Ok(self.session.read_resource(uri, timeout).await?)
    }

    async fn close(&self) {
        self.session.close().await;
    }
}
