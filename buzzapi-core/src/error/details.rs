//! Error detail structures for protocol and HTTP failures.

use super::request::RequestSnapshot;
use serde_json::Value;
use std::fmt;

#[cfg(feature = "backtrace")]
use std::backtrace::Backtrace;

/// Whom a protocol error can be blamed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorScope {
    /// Returned directly in reply to the caller's own submission.
    Submission,
    /// Returned by a poll and tied to exactly one message id.
    Message,
    /// Returned by a poll with no message id; every outstanding request fails.
    Session,
}

impl fmt::Display for ApiErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorScope::Submission => write!(f, "submission"),
            ApiErrorScope::Message => write!(f, "message"),
            ApiErrorScope::Session => write!(f, "session"),
        }
    }
}

/// Details of an `api_error_info` reported by the server.
///
/// The raw error info and the full response body are kept verbatim so the
/// caller sees exactly what the server said.
///
/// ```rust
/// use buzzapi_core::error::{ApiErrorDetails, ApiErrorScope};
///
/// let details = ApiErrorDetails::new(
///     ApiErrorScope::Message,
///     Some("ABC123".to_string()),
///     serde_json::json!({"success": false}),
///     serde_json::json!({"api_result_data": {"api_request_messageid": "ABC123"}}),
/// );
/// assert_eq!(details.message_id.as_deref(), Some("ABC123"));
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub struct ApiErrorDetails {
    /// Short description of what went wrong.
    pub message: String,
    /// Whom the error is attributed to.
    pub scope: ApiErrorScope,
    /// Message id the server attached to the error, if any.
    pub message_id: Option<String>,
    /// The raw `api_error_info` object.
    pub error_info: Value,
    /// The full response body the error was found in.
    pub body: Value,
    /// The request that produced the response, with credentials redacted.
    pub request: Option<RequestSnapshot>,
    /// Backtrace captured at error creation (feature-gated).
    #[cfg(feature = "backtrace")]
    pub backtrace: Backtrace,
}

impl ApiErrorDetails {
    /// Default message used when the server gave nothing better.
    pub const DEFAULT_MESSAGE: &'static str = "BuzzApi returned error_info";

    /// Creates new details with the default message and no request attached.
    pub fn new(
        scope: ApiErrorScope,
        message_id: Option<String>,
        error_info: Value,
        body: Value,
    ) -> Self {
        Self {
            message: Self::DEFAULT_MESSAGE.to_string(),
            scope,
            message_id,
            error_info,
            body,
            request: None,
            #[cfg(feature = "backtrace")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Attaches the (already redacted) request.
    #[must_use]
    pub fn with_request(mut self, request: RequestSnapshot) -> Self {
        self.request = Some(request);
        self
    }
}

impl fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message_id {
            Some(id) => write!(f, "{} ({} {id}): {}", self.message, self.scope, self.error_info),
            None => write!(f, "{} ({}): {}", self.message, self.scope, self.error_info),
        }
    }
}

/// Details of a non-success HTTP status.
#[derive(Debug)]
#[non_exhaustive]
pub struct HttpErrorDetails {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase, e.g. "Bad Request".
    pub reason: String,
    /// Raw response body; falls back to the reason phrase when empty.
    pub body: String,
    /// The request that produced the response, with credentials redacted.
    pub request: Option<RequestSnapshot>,
}

impl HttpErrorDetails {
    /// Creates new details, filling the reason phrase from the status code.
    pub fn new(status: u16, body: impl Into<String>, request: Option<RequestSnapshot>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status")
            .to_string();
        let mut body = body.into();
        if body.is_empty() {
            body.clone_from(&reason);
        }
        Self {
            status,
            reason,
            body,
            request,
        }
    }

    /// Returns `true` for 5xx statuses.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

impl fmt::Display for HttpErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.reason)
    }
}
