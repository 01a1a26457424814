//! Shared engine state.
//!
//! One [`Engine`] owns everything a client instance shares between callers
//! and its poll loop. Its behaviour is split by concern across
//! `dispatcher`, `poller`, and `pagination`, each adding an `impl Engine`
//! block.

use crate::correlation::CorrelationTable;
use crate::dispatcher::Dispatcher;
use buzzapi_core::config::ClientConfig;
use buzzapi_core::http_client::HttpClient;
use buzzapi_core::rate_limiter::RateLimiter;
use buzzapi_core::retry_strategy::RetryStrategy;
use buzzapi_core::transport::Transport;
use parking_lot::Mutex;
use std::sync::Arc;

/// State touched by both submissions and the poll loop.
///
/// Guarded by a single mutex that is never held across an await.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub(crate) table: CorrelationTable,
    /// Latest session ticket, last write wins.
    pub(crate) ticket: Option<String>,
    /// Set while a poll loop task is alive.
    pub(crate) polling: bool,
}

#[derive(Debug)]
pub(crate) struct Engine {
    pub(crate) config: ClientConfig,
    pub(crate) http: HttpClient,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) state: Mutex<EngineState>,
}

impl Engine {
    pub(crate) fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let http = HttpClient::new(
            transport,
            RateLimiter::new(config.rate_limit.clone()),
            RetryStrategy::new(config.retry_config.clone()),
        )
        .with_verbose(config.http.verbose);

        Self {
            dispatcher: Dispatcher::new(config.max_concurrent_submissions),
            http,
            config,
            state: Mutex::new(EngineState::default()),
        }
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.state.lock().table.len()
    }

    pub(crate) fn session_ticket(&self) -> Option<String> {
        self.state.lock().ticket.clone()
    }

    pub(crate) fn is_polling(&self) -> bool {
        self.state.lock().polling
    }
}
