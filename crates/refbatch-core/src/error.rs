//! Resolver error types.

use thiserror::Error;

/// Errors that can fail a resolve call.
///
/// Unresolved references are not errors: an object whose key has no
/// matching entity is simply absent from the output.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// HTTP request failed before a response arrived (connection refused, DNS, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The lookup endpoint answered with a non-2xx status.
    #[error("lookup endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Request timed out inside the fetch layer.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The cancellation signal fired while a batch was in flight.
    #[error("lookup cancelled")]
    Cancelled,

    /// Response body could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Invalid resolver or client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An unexpected error, including failures raised by caller callbacks.
    #[error("{0}")]
    Other(String),
}

impl ResolveError {
    /// Returns `true` if the call failed because its signal was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` for failures raised by the transport rather than by
    /// configuration or caller code.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Timeout { .. } | Self::Deserialization(_)
        )
    }
}
