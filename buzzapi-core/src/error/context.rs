//! Context attachment trait and implementations.

use crate::error::{Error, ParseError, Result};
use std::borrow::Cow;
use std::fmt;

/// Extension trait for ergonomic error context attachment.
///
/// Works with `Result<T, E>` where `E: Into<Error>` and with `Option<T>`;
/// a `None` becomes a missing-field parse error, since in this crate an
/// absent value almost always means a response lacked something.
///
/// ```rust
/// use buzzapi_core::error::{ContextExt, Result};
///
/// fn ticket(json: &serde_json::Value) -> Result<&str> {
///     json.get("api_app_ticket")
///         .and_then(|v| v.as_str())
///         .context("api_app_ticket")
/// }
/// ```
pub trait ContextExt<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Adds lazy context to an error (only evaluated on error).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ContextExt<T, E> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| e.into().context(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().context(f().to_string()))
    }
}

impl<T> ContextExt<T, Error> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| ParseError::MissingField(Cow::Owned(context.to_string())).into())
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| ParseError::MissingField(Cow::Owned(f().to_string())).into())
    }
}
