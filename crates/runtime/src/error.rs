use std::time::Duration;

use thiserror::Error;

use crate::model::ModelError;

/// Fatal errors: each one ends the conversation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model did not respond within {0:?}")]
    ModelTimeout(Duration),

    #[error("mcp: {0}")]
    Mcp(#[from] mcp::Error),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
