//! BuzzAPI Core Library
//!
//! Building blocks shared by the BuzzAPI client engine: the error model,
//! credentials and redaction, configuration, the outbound throttle, the
//! transport abstraction and the JSON HTTP client layered on it.
//!
//! # Example
//!
//! ```rust,no_run
//! use buzzapi_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let config = ClientConfig::from_env().map_err(|e| Error::invalid_request(e.to_string()))?;
//! let transport = Arc::new(ReqwestTransport::new(&config.http)?);
//! let client = HttpClient::new(
//!     transport,
//!     RateLimiter::new(config.rate_limit.clone()),
//!     RetryStrategy::new(config.retry_config.clone()),
//! );
//! let reply = client
//!     .post_json(&config.endpoint("directory/lookup"), &serde_json::json!({}))
//!     .await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]

// Re-exports of external dependencies
pub use serde_json;

pub mod config;
pub mod credentials;
pub mod error;
pub mod http_client;
pub mod logging;
pub mod rate_limiter;
pub mod request_handle;
pub mod retry_strategy;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{ClientConfig, ClientConfigBuilder, RequestMode};
pub use credentials::{Credentials, SecretString};
pub use error::{ContextExt, Error, NetworkError, ParseError, Result};
pub use transport::{HttpResponse, ReqwestTransport, Transport};

/// Prelude module for convenient imports
///
/// ```rust
/// use buzzapi_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ClientConfig, ClientConfigBuilder, RequestMode};
    pub use crate::credentials::{Credentials, SecretString};
    pub use crate::error::{ApiErrorDetails, ApiErrorScope, ContextExt, Error, Result};
    pub use crate::http_client::{HttpClient, HttpConfig, ProxyConfig};
    pub use crate::logging::{LogConfig, LogFormat, LogLevel, init_logging, try_init_logging};
    pub use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
    pub use crate::retry_strategy::{RetryConfig, RetryStrategy, RetryStrategyType};
    pub use crate::transport::{HttpResponse, ReqwestTransport, Transport};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
