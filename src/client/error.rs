//! Error types for the appliance management client.

use thiserror::Error;

/// Errors raised while exchanging requests with the appliance management API.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ClientError {
    /// Raised when the client is missing connection settings.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Raised when a request body cannot be serialised to JSON.
    #[error("failed to encode request for {endpoint}: {message}")]
    Encode {
        /// Endpoint the request was addressed to.
        endpoint: String,
        /// Serialiser message.
        message: String,
    },
    /// Raised when the request never produced an HTTP response.
    #[error("transport failure for {endpoint}: {message}")]
    Transport {
        /// Endpoint or URL the request was addressed to.
        endpoint: String,
        /// Error message from the HTTP stack.
        message: String,
    },
    /// Raised when the appliance rejects the login or no credentials exist.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Human readable reason.
        message: String,
    },
    /// Raised when a response body is not the JSON document we expect.
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode {
        /// Endpoint that produced the response.
        endpoint: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when an asynchronous appliance job never reports completion.
    #[error("timeout waiting for job behind {endpoint} after {waited_secs}s")]
    Timeout {
        /// Endpoint that returned `202 Accepted`.
        endpoint: String,
        /// Number of whole seconds spent polling.
        waited_secs: u64,
    },
}

impl ClientError {
    /// Returns true when the failure is worth retrying on a later resync.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}
