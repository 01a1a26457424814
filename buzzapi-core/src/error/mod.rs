//! # Error Handling for the BuzzAPI client
//!
//! Every failure the client can surface is an [`Error`]. The variants map onto
//! the ways a request to the request/poll protocol can end badly:
//!
//! ```text
//! Error
//! ├── Network        - connection, DNS or TLS failure (via NetworkError)
//! ├── Http           - non-2xx status from the server (via HttpErrorDetails)
//! ├── Api            - the server reported `api_error_info` (via ApiErrorDetails)
//! ├── Timeout        - a pending request outlived its receive timeout
//! ├── PollExhausted  - the poll call kept failing past its budget
//! ├── Parse          - response body was not the expected shape (via ParseError)
//! ├── InvalidRequest - caller handed the client something unusable
//! ├── Cancelled      - the engine dropped a request without an answer
//! └── Context        - any of the above with additional context
//! ```
//!
//! Errors that carry request data (`Http`, `Api`) always carry it as a
//! [`RequestSnapshot`], whose constructor strips credentials before anything
//! else can see the body.
//!
//! ## Quick Start
//!
//! ```rust
//! use buzzapi_core::error::{Error, Result};
//!
//! fn require_object(payload: &serde_json::Value) -> Result<()> {
//!     if !payload.is_object() {
//!         return Err(Error::invalid_request("payload must be a JSON object"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Telling the error kinds apart
//!
//! ```rust
//! use buzzapi_core::error::{ApiErrorScope, Error};
//!
//! fn describe(err: &Error) -> String {
//!     if let Some(id) = err.timed_out_message_id() {
//!         return format!("gave up waiting on {id}");
//!     }
//!     if let Some(api) = err.as_api() {
//!         return match api.scope {
//!             ApiErrorScope::Session => "server error affecting the whole session".into(),
//!             _ => format!("server rejected {:?}", api.message_id),
//!         };
//!     }
//!     err.report()
//! }
//! ```

mod config;
mod context;
mod convert;
mod details;
mod network;
mod parse;
mod request;

use std::borrow::Cow;
use std::error::Error as StdError;
use thiserror::Error;

pub use config::{ConfigValidationError, ValidationResult};
pub use context::ContextExt;
pub use details::{ApiErrorDetails, ApiErrorScope, HttpErrorDetails};
pub use network::NetworkError;
pub use parse::ParseError;
pub use request::{REDACTED, REDACTED_FIELDS, RequestSnapshot, redact_credentials};

/// Result type alias for all client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message attached to [`Error::PollExhausted`].
pub const POLL_EXHAUSTED_MESSAGE: &str = "Failed to get results from BuzzAPI";

/// The primary error type of the client.
///
/// Large variants are boxed to keep the enum small; every error must be
/// cheap to move through the one-shot channels that deliver outcomes.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Transport layer failure before any HTTP status was received.
    #[error("Network error: {0}")]
    Network(Box<NetworkError>),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(Box<HttpErrorDetails>),

    /// The server answered successfully but reported a logical error.
    #[error("BuzzAPI error: {0}")]
    Api(Box<ApiErrorDetails>),

    /// A pending request aged past its receive timeout.
    #[error("Request timed out for: {message_id}")]
    Timeout {
        /// Message id of the expired request
        message_id: String,
    },

    /// The poll call failed more times in a row than the configured budget.
    #[error("Failed to get results from BuzzAPI after {attempts} attempts: {last_error}")]
    PollExhausted {
        /// Consecutive failed poll attempts
        attempts: u32,
        /// The failure of the last attempt, rendered
        last_error: String,
    },

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(Box<ParseError>),

    /// Invalid request parameters supplied by the caller.
    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    /// The engine went away before delivering an outcome.
    #[error("Cancelled: {0}")]
    Cancelled(Cow<'static, str>),

    /// Error with additional context, preserving the error chain.
    #[error("{context}")]
    Context {
        /// Context message describing what operation failed
        context: String,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    // ==================== Constructor Methods ====================

    /// Creates a network error from a message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(Box::new(NetworkError::ConnectionFailed(msg.into())))
    }

    /// Creates an HTTP status error.
    pub fn http(status: u16, body: impl Into<String>, request: Option<RequestSnapshot>) -> Self {
        Self::Http(Box::new(HttpErrorDetails::new(status, body, request)))
    }

    /// Creates a protocol error from the server's `api_error_info`.
    pub fn api(details: ApiErrorDetails) -> Self {
        Self::Api(Box::new(details))
    }

    /// Creates a timeout error for one message id.
    pub fn timeout(message_id: impl Into<String>) -> Self {
        Self::Timeout {
            message_id: message_id.into(),
        }
    }

    /// Creates a poll exhaustion error.
    pub fn poll_exhausted(attempts: u32, last_error: &Error) -> Self {
        Self::PollExhausted {
            attempts,
            last_error: last_error.to_string(),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Creates a cancelled error.
    pub fn cancelled(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Cancelled(msg.into())
    }

    // ==================== Context Methods ====================

    /// Attaches context to an existing error.
    ///
    /// ```rust
    /// use buzzapi_core::error::Error;
    ///
    /// let err = Error::network("Connection refused")
    ///     .context("Failed to submit directory/lookup");
    /// assert!(err.report().contains("Connection refused"));
    /// ```
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    // ==================== Chain Traversal Methods ====================

    fn iter_chain(&self) -> impl Iterator<Item = &Error> {
        std::iter::successors(Some(self), |err| match err {
            Error::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        })
    }

    /// Returns the root cause of the error, skipping Context layers.
    #[must_use]
    pub fn root_cause(&self) -> &Error {
        self.iter_chain().last().unwrap_or(self)
    }

    /// Generates a detailed error report with the full chain.
    #[must_use]
    pub fn report(&self) -> String {
        use std::fmt::Write;
        let mut report = String::new();
        report.push_str(&self.to_string());

        let mut current: Option<&(dyn StdError + 'static)> = self.source();
        while let Some(err) = current {
            let _ = write!(report, "\nCaused by: {err}");
            current = err.source();
        }
        report
    }

    // ==================== Helper Methods (Context Penetrating) ====================

    /// Checks if this error is worth another attempt at the transport level.
    ///
    /// Returns `true` for connection failures, transport timeouts and 5xx
    /// statuses. Protocol errors are never retryable: the server has already
    /// given its answer.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.root_cause() {
            Error::Network(ne) => ne.is_retryable(),
            Error::Http(details) => details.is_server_error(),
            _ => false,
        }
    }

    /// Returns the protocol error details (penetrates Context layers).
    #[must_use]
    pub fn as_api(&self) -> Option<&ApiErrorDetails> {
        match self.root_cause() {
            Error::Api(details) => Some(details),
            _ => None,
        }
    }

    /// Returns the HTTP error details (penetrates Context layers).
    #[must_use]
    pub fn as_http(&self) -> Option<&HttpErrorDetails> {
        match self.root_cause() {
            Error::Http(details) => Some(details),
            _ => None,
        }
    }

    /// Returns the message id of a timed out request.
    #[must_use]
    pub fn timed_out_message_id(&self) -> Option<&str> {
        match self.root_cause() {
            Error::Timeout { message_id } => Some(message_id),
            _ => None,
        }
    }

    /// Returns the message id this error is attributed to, if any.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        match self.root_cause() {
            Error::Timeout { message_id } => Some(message_id),
            Error::Api(details) => details.message_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the redacted request attached to this error, if any.
    #[must_use]
    pub fn request(&self) -> Option<&RequestSnapshot> {
        match self.root_cause() {
            Error::Api(details) => details.request.as_ref(),
            Error::Http(details) => details.request.as_ref(),
            _ => None,
        }
    }

    /// Checks whether this is a poll exhaustion error.
    #[must_use]
    pub fn is_poll_exhausted(&self) -> bool {
        matches!(self.root_cause(), Error::PollExhausted { .. })
    }
}

#[cfg(test)]
mod tests;
