//! Error types for sink operations

use std::fmt;

/// Result type alias for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors that can occur while appending to or probing a sink
#[derive(Debug)]
pub enum SinkError {
    /// The sink endpoint could not be reached
    ConnectionFailed(String),

    /// The sink rejected the write
    WriteFailed(String),

    /// Invalid sink configuration
    InvalidConfig(String),

    /// Transport-level HTTP error
    Http(reqwest::Error),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to sink: {}", msg)
            }
            SinkError::WriteFailed(msg) => write!(f, "sink write failed: {}", msg),
            SinkError::InvalidConfig(msg) => write!(f, "invalid sink configuration: {}", msg),
            SinkError::Http(err) => write!(f, "sink transport error: {}", err),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Http(err)
    }
}
