//! # BuzzAPI
//!
//! Async Rust client for the BuzzAPI request/poll protocol.
//!
//! ## Features
//!
//! - **Sync and async modes**: results either come back with the submission
//!   or are collected by a shared poll loop and routed to their callers
//! - **Bounded submissions**: a FIFO-fair ceiling on submissions in flight
//! - **Pagination**: cursor-following calls that concatenate every page
//! - **Credential safety**: passwords never appear in errors or logs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use buzzapi::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     init_logging(&LogConfig::default());
//!
//!     let config = ClientConfig::builder()
//!         .credentials("svc-directory", "hunter2")
//!         .build()?;
//!     let client = BuzzApi::new(config)?;
//!
//!     let person = client
//!         .post("central.iam.gted.people", "search", &json!({"username": "gburdell3"}))
//!         .await?;
//!     println!("{person}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub use buzzapi_client::{BuzzApi, PostOptions};
pub use buzzapi_core::{
    config::{ClientConfig, ClientConfigBuilder, RequestMode},
    credentials::Credentials,
    error::{Error, Result},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use buzzapi_client::prelude::*;
}
