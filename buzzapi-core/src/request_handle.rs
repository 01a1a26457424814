//! Client request handles.
//!
//! Every call carries an `api_client_request_handle` so the server side can
//! correlate logs with the calling process: `{pid}@{hostname}-{unique}`.

use std::sync::OnceLock;
use uuid::Uuid;

static HOST_PREFIX: OnceLock<String> = OnceLock::new();

fn hostname() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Generates a new request handle.
///
/// ```rust
/// let handle = buzzapi_core::request_handle::new_handle();
/// assert!(handle.starts_with(&format!("{}@", std::process::id())));
/// ```
pub fn new_handle() -> String {
    let prefix =
        HOST_PREFIX.get_or_init(|| format!("{}@{}", std::process::id(), hostname()));
    format!("{prefix}-{}", Uuid::new_v4().simple())
}
