use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while invoking a capability.
///
/// None of these end the conversation: the dispatcher turns each into the
/// text of a tool result.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("capability not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("execution failed: {0}")]
    Execution(String),
}

impl From<mcp::Error> for ToolError {
    fn from(err: mcp::Error) -> Self {
        match err {
            mcp::Error::Timeout(limit) => Self::Timeout(limit),
            mcp::Error::ToolCallFailed(text) => Self::Execution(text),
            other => Self::Execution(other.to_string()),
        }
    }
}
