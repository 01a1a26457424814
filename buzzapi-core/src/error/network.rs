//! Network-related error types.

use std::error::Error as StdError;
use thiserror::Error;

/// Transport failures that happen before the server produced a status.
///
/// Wraps the underlying HTTP library's errors without exposing its types in
/// the public API.
///
/// # Retryable Errors
///
/// - [`NetworkError::Timeout`]
/// - [`NetworkError::ConnectionFailed`]
/// - [`NetworkError::Transport`]
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NetworkError {
    /// Request timed out at the transport.
    #[error("Request timeout")]
    Timeout,

    /// Connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// DNS resolution failed.
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    /// SSL/TLS error.
    #[error("SSL/TLS error: {0}")]
    Ssl(String),

    /// Opaque transport error for underlying issues.
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

impl NetworkError {
    /// Returns `true` when another attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::Timeout | NetworkError::ConnectionFailed(_) | NetworkError::Transport(_)
        )
    }
}
