//! LLM protocol types and backend trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Backend, InputSchema, Message, ModelRequest, ModelResponse, Part, Role, StopReason, ToolResult,
    ToolSpec, ToolUse, Usage,
};
