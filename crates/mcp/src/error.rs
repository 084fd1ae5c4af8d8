//! MCP error types.

use std::time::Duration;

use rmcp::service::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn server: {0}")]
    Io(#[from] std::io::Error),

    #[error("initialize failed: {0}")]
    Initialize(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("session closed")]
    Closed,

    #[error("timeout after {0:?} waiting for response")]
    Timeout(Duration),

    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("output too large: {size} bytes (max {max})")]
    OutputTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
