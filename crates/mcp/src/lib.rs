//! MCP (Model Context Protocol) client library.
//!
//! This crate wraps the rmcp SDK in a session for MCP servers reached either
//! over streamable HTTP or over the stdio of a spawned child process.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Endpoint, Session, DEFAULT_TIMEOUT};
//!
//! # async fn example() -> mcp::Result<()> {
//! let session = Session::connect(Endpoint::Http("http://localhost:8080/mcp".into())).await?;
//!
//! if session.supports_tools() {
//!     for tool in session.list_tools().await? {
//!         println!("Tool: {}", tool.name);
//!     }
//! }
//!
//! let arguments = serde_json::json!({ "name": "Ada" });
//! let result = session
//!     .call_tool("register_customer", arguments.as_object().cloned(), DEFAULT_TIMEOUT)
//!     .await?;
//! println!("{result}");
//!
//! session.close().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod session;

pub use client::{CLIENT_NAME, Notification};
pub use error::{Error, Result};
pub use rmcp::model::{Implementation, Resource, ServerCapabilities, Tool};
pub use session::{DEFAULT_TIMEOUT, Endpoint, MAX_OUTPUT_SIZE, MAX_PAGES, ServerCommand, Session};
