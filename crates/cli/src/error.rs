//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors. Any of these ends the process with status 1.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is invalid or the credential is missing.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The MCP server could not be reached or refused the handshake.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: mcp::Error,
    },

    /// The conversation ended on a fatal error.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
