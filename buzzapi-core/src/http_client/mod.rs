//! JSON-over-HTTP client.
//!
//! Wraps a [`Transport`](crate::transport::Transport) with:
//! - the shared outbound throttle, consulted before every attempt
//! - transport-level retries driven by a [`RetryStrategy`](crate::retry_strategy::RetryStrategy)
//! - JSON encoding of request bodies and decoding of response bodies
//! - typed HTTP errors carrying a redacted snapshot of the request
//!
//! # Example
//!
//! ```rust,no_run
//! use buzzapi_core::http_client::{HttpClient, HttpConfig};
//! use buzzapi_core::rate_limiter::RateLimiter;
//! use buzzapi_core::retry_strategy::RetryStrategy;
//! use buzzapi_core::transport::ReqwestTransport;
//! use std::sync::Arc;
//!
//! # async fn example() -> buzzapi_core::Result<()> {
//! let transport = Arc::new(ReqwestTransport::new(&HttpConfig::default())?);
//! let client = HttpClient::new(transport, RateLimiter::default(), RetryStrategy::default());
//!
//! let reply = client
//!     .post_json("https://api.example.edu/apiv3/test/test", &serde_json::json!({}))
//!     .await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod request;
mod response;
mod retry;


pub use builder::HttpClient;
pub use config::{HttpConfig, ProxyConfig};
