//! BuzzAPI client engine
//!
//! Correlates concurrent callers with results the BuzzAPI server delivers
//! asynchronously. Submissions pass through a bounded dispatcher; async
//! submissions are answered with a message id, and a single shared poll
//! loop collects results for every outstanding id and routes each one back
//! to its caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use buzzapi_client::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() -> Result<()> {
//! let client = BuzzApi::new(ClientConfig::from_env()?)?;
//!
//! let people = client
//!     .post_with(
//!         "central.iam.gted.people",
//!         "search",
//!         &json!({"lastname": "Burdell"}),
//!         PostOptions::paged(),
//!     )
//!     .await?;
//! # let _ = people;
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

mod client;
mod correlation;
mod dispatcher;
mod engine;
mod envelope;
mod options;
mod pagination;
mod poller;

pub use client::BuzzApi;
pub use options::PostOptions;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::BuzzApi;
    pub use crate::options::PostOptions;
    pub use buzzapi_core::prelude::*;
}
