//! In-memory backend and host for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::catalog::CapabilityEntry;
use crate::model::{Backend, Message, ModelError, ModelRequest, ModelResponse, StopReason, Usage};
use crate::tools::{CapabilityHost, ToolError};

/// A call the host received.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Tool { name: String, arguments: Value },
    Resource { uri: String },
}

#[derive(Default)]
struct HostState {
    tools: Vec<CapabilityEntry>,
    resources: Vec<CapabilityEntry>,
    fail_tool_listing: bool,
    responses: HashMap<String, Result<Value, String>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<HostCall>>,
    tool_listings: AtomicUsize,
    resource_listings: AtomicUsize,
    closes: AtomicUsize,
}

/// Host with canned responses keyed by tool name or resource URI.
///
/// Clones share state, so a test can keep a handle after moving the host
/// into an agent.
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Arc<HostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn configure(mut self, f: impl FnOnce(&mut HostState)) -> Self {
        let state = Arc::get_mut(&mut self.state).expect("configure before cloning");
        f(state);
        self
    }

    pub fn with_tool(self, entry: CapabilityEntry) -> Self {
        self.configure(|s| s.tools.push(entry))
    }

    pub fn with_resource(self, entry: CapabilityEntry) -> Self {
        self.configure(|s| s.resources.push(entry))
    }

    pub fn failing_tool_listing(self) -> Self {
        self.configure(|s| s.fail_tool_listing = true)
    }

    pub fn respond(self, key: &str, value: Value) -> Self {
        self.configure(|s| {
            s.responses.insert(key.to_string(), Ok(value));
        })
    }

    pub fn fail(self, key: &str, message: &str) -> Self {
        self.configure(|s| {
            s.responses.insert(key.to_string(), Err(message.to_string()));
        })
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.configure(|s| s.delay = Some(delay))
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> (usize, usize) {
        (
            self.state.tool_listings.load(Ordering::SeqCst),
            self.state.resource_listings.load(Ordering::SeqCst),
        )
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    async fn answer(&self, key: &str, call: HostCall) -> Result<Value, ToolError> {
        self.state.calls.lock().unwrap().push(call);
        if let Some(delay) = self.state.delay {
            tokio::time::sleep(delay).await;
        }
        match self.state.responses.get(key) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(ToolError::Execution(message.clone())),
            None => Ok(Value::Object(Map::new())),
        }
    }
}

impl CapabilityHost for FakeHost {
    async fn list_tools(&self) -> Result<Vec<CapabilityEntry>, ToolError> {
        self.state.tool_listings.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_tool_listing {
            return Err(ToolError::Execution("tools/list refused".into()));
        }
        Ok(self.state.tools.clone())
    }

    async fn list_resources(&self) -> Result<Vec<CapabilityEntry>, ToolError> {
        self.state.resource_listings.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.resources.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        _timeout: Duration,
    ) -> Result<Value, ToolError> {
        let call = HostCall::Tool {
            name: name.to_string(),
            arguments: Value::Object(arguments),
        };
        self.answer(name, call).await
    }

    async fn read_resource(&self, uri: &str, _timeout: Duration) -> Result<Value, ToolError> {
        let call = HostCall::Resource {
            uri: uri.to_string(),
        };
        self.answer(uri, call).await
    }

    async fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend replaying a fixed list of assistant messages.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    replies: Arc<Mutex<VecDeque<Message>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = Message>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The history sent with each request, in order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(request.messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let message = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::InvalidResponse("script exhausted".into()))?;
        let stop_reason = if message.tool_uses().is_empty() {
            StopReason::EndTurn
        } else {
            StopReason::ToolUse
        };

        Ok(ModelResponse {
            message,
            usage: Usage::default(),
            stop_reason,
        })
    }
}
