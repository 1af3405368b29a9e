//! Error types for the ServerQuery backend.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// The server answered a command with a non-zero result line.
    #[error("server returned error {id}: {msg}")]
    Command { id: u32, msg: String },

    /// The connection produced something the codec cannot make sense of
    /// (bad greeting, response without a result line).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A response is missing a field the caller requires.
    #[error("response missing field {field}")]
    MissingField { field: &'static str },

    /// A response field exists but does not parse as the expected type.
    #[error("response field {field} has invalid value {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("query io error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// True for failures worth retrying on a later cycle (network trouble),
    /// false for responses the server actively rejected.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Protocol(_))
    }
}
