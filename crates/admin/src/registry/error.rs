//! Error types for the registry REST client.

use thiserror::Error;

/// Errors raised by [`RegistryClient`](super::RegistryClient) before a
/// payload is available to the caller.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// HTTP request failed (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry answered with a non-success status.
    #[error("registry returned HTTP {0}")]
    Status(u16),

    /// The body was not a registry payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// The token cannot be sent as a header value.
    #[error("invalid access token")]
    InvalidToken,
}
