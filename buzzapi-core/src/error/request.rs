//! Redacted copies of outbound requests, attached to errors.

use serde_json::Value;
use std::fmt;

/// Marker written in place of a credential value.
pub const REDACTED: &str = "[REDACTED]";

/// Body fields that hold credentials and must never leave the client in an error.
pub const REDACTED_FIELDS: &[&str] = &["api_app_password", "api_user_password", "password_base64"];

/// Replaces every credential field in `body` with [`REDACTED`].
///
/// Objects are walked recursively so a password nested inside a caller
/// payload is stripped as well. Non-object values are left untouched.
///
/// ```rust
/// use buzzapi_core::error::{REDACTED, redact_credentials};
///
/// let mut body = serde_json::json!({"api_app_id": "me", "api_app_password": "c2VjcmV0"});
/// redact_credentials(&mut body);
/// assert_eq!(body["api_app_password"], REDACTED);
/// assert_eq!(body["api_app_id"], "me");
/// ```
pub fn redact_credentials(body: &mut Value) {
    match body {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if REDACTED_FIELDS.contains(&key.as_str()) {
                    if !value.is_null() {
                        *value = Value::String(REDACTED.to_string());
                    }
                } else {
                    redact_credentials(value);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_credentials),
        _ => {}
    }
}

/// The URL and body of a request, as it may appear inside an error.
///
/// The only way to build one is [`RequestSnapshot::new`], which redacts the
/// body before storing it; there is no accessor that hands out the original.
#[derive(Clone, PartialEq)]
pub struct RequestSnapshot {
    url: String,
    body: Value,
}

impl RequestSnapshot {
    /// Captures `url` and a redacted copy of `body`.
    pub fn new(url: impl Into<String>, body: &Value) -> Self {
        let mut body = body.clone();
        redact_credentials(&mut body);
        Self {
            url: url.into(),
            body,
        }
    }

    /// Target URL of the request.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Redacted request body.
    pub fn body(&self) -> &Value {
        &self.body
    }
}

impl fmt::Debug for RequestSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSnapshot")
            .field("url", &self.url)
            .field("body", &self.body.to_string())
            .finish()
    }
}
