//! MCP session lifecycle (connect, request, close).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;

use rmcp::ServiceExt;
use rmcp::model::{
    CallToolRequestParams, Implementation, PaginatedRequestParams, RawContent,
    ReadResourceRequestParams, Resource, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{Peer, RoleClient, RunningService, ServiceError};
use rmcp::transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio::process::Command;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::client::{Notification, NotificationForwarder};
use crate::error::{Error, Result};

/// Default timeout for MCP operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum size of a tool result or resource read handed to the caller (1MB).
///
/// This bounds what enters the conversation. The transport has already
/// buffered the whole message by the time it is measured.
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Pages followed before a listing is abandoned.
pub const MAX_PAGES: usize = 64;

/// Command line for a server spoken to over stdio.
#[derive(Debug, Clone)]
pub struct ServerCommand {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// Where the MCP server lives.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// Streamable HTTP endpoint, e.g. `http://localhost:8080/mcp`.
    Http(String),
    /// A child process spawned and owned by the session.
    Stdio(ServerCommand),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(url) => write!(f, "{url}"),
            Self::Stdio(cmd) => {
                write!(f, "{}", cmd.command)?;
                for arg in &cmd.args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

type Service = RunningService<RoleClient, NotificationForwarder>;

/// An initialized connection to an MCP server.
pub struct Session {
    endpoint: Endpoint,
    peer: Peer<RoleClient>,
    service: Mutex<Option<Service>>,
    server: ServerInfo,
    notifications: StdMutex<Option<mpsc::UnboundedReceiver<Notification>>>,
    closed: AtomicBool,
}

impl Session {
    /// Connect to a server and run the `initialize` handshake.
    ///
    /// On handshake failure the transport is torn down before returning.
    pub async fn connect(endpoint: Endpoint) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = NotificationForwarder::new(tx);

        let service = tokio::time::timeout(DEFAULT_TIMEOUT, start_service(&endpoint, handler))
            .await
            .map_err(|_| Error::Timeout(DEFAULT_TIMEOUT))??;

        let Some(server) = service.peer_info().cloned() else {
            if let Err(e) = service.cancel().await {
                warn!("mcp service did not stop cleanly: {e}");
            }
            return Err(Error::InvalidResponse("server sent no initialize result".into()));
        };

        info!(
            server = %server.server_info.name,
            protocol = ?server.protocol_version,
            %endpoint,
            "mcp session initialized"
        );

        Ok(Self {
            endpoint,
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            server,
            notifications: StdMutex::new(Some(rx)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server.server_info
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.server.capabilities
    }

    /// Whether the server advertised the tools capability.
    pub fn supports_tools(&self) -> bool {
        self.server.capabilities.tools.is_some()
    }

    /// Whether the server advertised the resources capability.
    pub fn supports_resources(&self) -> bool {
        self.server.capabilities.resources.is_some()
    }

    /// Take the receiver of server notifications. Returns `None` after the
    /// first call.
    pub fn take_notifications(&self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// List every tool, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursors = CursorGuard::new("tools/list");
        let mut cursor = None;
        loop {
            let params = Some(paginated(cursor)?);
            let page = self.bounded(DEFAULT_TIMEOUT, self.peer.list_tools(params)).await?;
            tools.extend(page.tools);
            cursor = cursors.follow(page.next_cursor)?;
            if cursor.is_none() {
                return Ok(tools);
            }
        }
    }

    /// List every resource, following pagination.
    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut cursors = CursorGuard::new("resources/list");
        let mut cursor = None;
        loop {
            let params = Some(paginated(cursor)?);
            let page = self
                .bounded(DEFAULT_TIMEOUT, self.peer.list_resources(params))
                .await?;
            resources.extend(page.resources);
            cursor = cursors.follow(page.next_cursor)?;
            if cursor.is_none() {
                return Ok(resources);
            }
        }
    }

    /// Call a tool by name and return the whole result as JSON.
    ///
    /// A result flagged `isError` is returned as [`Error::ToolCallFailed`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
        timeout: Duration,
    ) -> Result<Value> {
        let params = CallToolRequestParams {
            name: name.to_string().into(),
            arguments,
            meta: None,
            task: None,
        };

        let result = self.bounded(timeout, self.peer.call_tool(params)).await?;

        if result.is_error == Some(true) {
            let error_text = result
                .content
                .iter()
                .filter_map(|c| match &c.raw {
                    RawContent::Text(text) => Some(text.text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            return Err(Error::ToolCallFailed(error_text));
        }

        debug!(tool = name, "tool call returned");
        limit_size(serde_json::to_value(&result)?, MAX_OUTPUT_SIZE)
    }

    /// Read a resource by URI and return its contents as JSON.
    pub async fn read_resource(&self, uri: &str, timeout: Duration) -> Result<Value> {
        let params: ReadResourceRequestParams = request_params(json!({ "uri": uri }))?;
        let result = self.bounded(timeout, self.peer.read_resource(params)).await?;
        limit_size(serde_json::to_value(&result.contents)?, MAX_OUTPUT_SIZE)
    }

    /// Close the session. Later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let service = self.service.lock().await.take();
        if let Some(service) = service
            && let Err(e) = service.cancel().await
        {
            warn!("mcp service did not stop cleanly: {e}");
        }
        info!(endpoint = %self.endpoint, "mcp session closed");
    }

    async fn bounded<T>(
        &self,
        limit: Duration,
        request: impl Future<Output = std::result::Result<T, ServiceError>>,
    ) -> Result<T> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        tokio::time::timeout(limit, request)
            .await
            .map_err(|_| Error::Timeout(limit))?
            .map_err(Error::from)
    }
}

async fn start_service(endpoint: &Endpoint, handler: NotificationForwarder) -> Result<Service> {
    match endpoint {
        Endpoint::Http(url) => {
            let transport = StreamableHttpClientTransport::from_uri(url.clone());
            handler.serve(transport).await.map_err(initialize_failed)
        }
        Endpoint::Stdio(command) => {
            let transport = child_process(command)?;
            handler.serve(transport).await.map_err(initialize_failed)
        }
    }
}

fn child_process(command: &ServerCommand) -> Result<TokioChildProcess> {
    let transport = TokioChildProcess::new(Command::new(&command.command).configure(|cmd| {
        cmd.args(&command.args).envs(&command.env);
    }))?;
    Ok(transport)
}

fn initialize_failed(err: impl std::fmt::Display) -> Error {
    Error::Initialize(err.to_string())
}

// Built from JSON so optional protocol fields such as `_meta` stay unset.
fn request_params<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

fn paginated(cursor: Option<String>) -> Result<PaginatedRequestParams> {
    request_params(json!({ "cursor": cursor }))
}

fn limit_size(value: Value, max: usize) -> Result<Value> {
    let size = value.to_string().len();
    if size > max {
        return Err(Error::OutputTooLarge { size, max });
    }
    Ok(value)
}

/// Stops a listing whose server repeats a cursor or never stops paging.
struct CursorGuard {
    method: &'static str,
    seen: HashSet<String>,
}

impl CursorGuard {
    fn new(method: &'static str) -> Self {
        Self {
            method,
            seen: HashSet::new(),
        }
    }

    /// The cursor to request next, or `None` when the listing is complete.
    fn follow(&mut self, next: Option<String>) -> Result<Option<String>> {
        let Some(cursor) = next else {
            return Ok(None);
        };
        if self.seen.len() >= MAX_PAGES {
            return Err(Error::InvalidResponse(format!(
                "{}: more than {MAX_PAGES} pages",
                self.method
            )));
        }
        if !self.seen.insert(cursor.clone()) {
            return Err(Error::InvalidResponse(format!(
                "{}: cursor {cursor:?} repeated",
                self.method
            )));
        }
        Ok(Some(cursor))
    }
}
