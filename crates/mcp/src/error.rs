//! MCP error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn server: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("initialize failed: {0}")]
    Initialize(String),

    #[error("request failed: {0}")]
    Service(#[from] rmcp::ServiceError),

    #[error("timeout waiting for response")]
    Timeout,

    #[error("transport closed")]
    Closed,

    #[error("tool arguments must be a JSON object")]
    InvalidArguments,
}

pub type Result<T> = std::result::Result<T, Error>;
