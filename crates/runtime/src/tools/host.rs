//! Capability host trait.

use std::future::Future;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::catalog::CapabilityEntry;
use crate::tools::ToolError;

/// The remote side of the conversation: lists and invokes capabilities.
///
/// This is the boundary between the conversation loop and side effects.
pub trait CapabilityHost: Send + Sync {
    /// Tools offered by the host, as catalog entries.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<CapabilityEntry>, ToolError>> + Send;

    /// Resources offered by the host, as catalog entries.
    fn list_resources(
        &self,
    ) -> impl Future<Output = Result<Vec<CapabilityEntry>, ToolError>> + Send;

    /// Invoke a tool, waiting at most `timeout`.
    fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value, ToolError>> + Send;

    /// Read a resource by URI, waiting at most `timeout`.
    fn read_resource(
        &self,
        uri: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value, ToolError>> + Send;

    /// Tear down the connection. Called once when the conversation ends.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
