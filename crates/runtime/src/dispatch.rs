//! Route a model-requested capability to the host.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CapabilityKind};
use crate::model::ToolResult;
use crate::tools::{CapabilityHost, ToolArguments, ToolError};

/// Default bound on a single tool call or resource read.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one invocation, already rendered as text for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub payload: String,
}

impl DispatchOutcome {
    fn success(value: &Value) -> Self {
        Self {
            success: true,
            payload: value.to_string(),
        }
    }

    fn failure(error: &ToolError) -> Self {
        Self {
            success: false,
            payload: error.to_string(),
        }
    }

    /// Attach the outcome to the tool use it answers.
    pub fn into_tool_result(self, tool_use_id: impl Into<String>) -> ToolResult {
        if self.success {
            ToolResult::success(tool_use_id, self.payload)
        } else {
            ToolResult::error(tool_use_id, self.payload)
        }
    }
}

/// Which backend call a name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tool,
    Resource,
}

/// Resolves names against the catalog and invokes the host.
pub struct Dispatcher<H> {
    host: H,
    catalog: Catalog,
    timeout: Duration,
}

impl<H: CapabilityHost> Dispatcher<H> {
    pub fn new(host: H, catalog: Catalog) -> Self {
        Self {
            host,
            catalog,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Tools shadow resources of the same name.
    pub fn route(&self, name: &str) -> Option<Route> {
        if self.catalog.find_tool(name).is_some() {
            Some(Route::Tool)
        } else if self.catalog.find_resource(name).is_some() {
            Some(Route::Resource)
        } else {
            None
        }
    }

    /// Invoke `name` with the model-supplied arguments.
    ///
    /// Never fails: every error becomes an unsuccessful outcome.
    pub async fn invoke(&self, name: &str, arguments: &Value) -> DispatchOutcome {
        match self.try_invoke(name, arguments).await {
            Ok(value) => {
                debug!(capability = name, "capability succeeded");
                DispatchOutcome::success(&value)
            }
            Err(e) => {
                warn!(capability = name, "capability failed: {e}");
                DispatchOutcome::failure(&e)
            }
        }
    }

    async fn try_invoke(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let ToolArguments(arguments) = ToolArguments::try_from(arguments.clone())?;

        if self.catalog.find_tool(name).is_some() {
            let call = self.host.call_tool(name, arguments, self.timeout);
            return self.bounded(call).await;
        }

        match self.catalog.find_resource(name).map(|entry| &entry.kind) {
            Some(CapabilityKind::Resource { uri }) => {
                let read = self.host.read_resource(uri, self.timeout);
                self.bounded(read).await
            }
            _ => Err(ToolError::NotFound(name.to_string())),
        }
    }

    async fn bounded(
        &self,
        call: impl Future<Output = Result<Value, ToolError>>,
    ) -> Result<Value, ToolError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ToolError::Timeout(self.timeout))?
    }
}
