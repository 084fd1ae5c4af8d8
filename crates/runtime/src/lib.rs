//! Tiller runtime: the agentic tool-use loop.
//!
//! This crate connects a language model to the tools and resources of an MCP
//! server and drives the conversation between them.
//!
//! # Overview
//!
//! - **Catalog**: the tools and resources discovered once at startup.
//! - **Schema translation**: catalog entries become model tool declarations;
//!   resources are declared as tools without arguments.
//! - **Dispatcher**: resolves a requested name (tools first, then resources)
//!   and turns every outcome into text for the model.
//! - **Agent**: owns the history and runs turns until the operator exits.
//!
//! # Example
//!
//! ```no_run
//! use mcp::Endpoint;
//! use runtime::{Agent, AnthropicBackend, Catalog, Dispatcher, McpHost};
//!
//! # async fn example() -> runtime::Result<()> {
//! let host = McpHost::connect(Endpoint::Http("http://localhost:8080/mcp".into())).await?;
//! let catalog = Catalog::load(&host, host.supports_tools(), host.supports_resources()).await;
//! let backend = AnthropicBackend::builder("sk-ant-api03-...", "claude-3-7-sonnet-latest").build();
//!
//! let mut agent = Agent::new(backend, Dispatcher::new(host, catalog));
//! agent.push_user_text("How can you help me?");
//!
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! agent.run(stdin, std::io::stdout(), std::future::pending()).await
//! # }
//! ```

mod agent;
mod catalog;
mod dispatch;
mod error;
pub mod model;
mod providers;
mod schema;
pub mod tools;

#[cfg(test)]
mod testing;

pub use agent::{Agent, DEFAULT_TURN_TIMEOUT, EXIT_COMMAND, TurnOutcome};
pub use catalog::{CapabilityEntry, CapabilityKind, Catalog};
pub use dispatch::{DEFAULT_CALL_TIMEOUT, DispatchOutcome, Dispatcher, Route};
pub use error::{Error, Result};
pub use model::{Backend, Message, ModelError, Part, Role, ToolResult, ToolSpec, ToolUse};
pub use providers::{
    ANTHROPIC_API_URL, AnthropicBackend, AnthropicBackendBuilder, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL,
};
pub use schema::to_declarations;
pub use tools::{CapabilityHost, McpHost, ToolError};
