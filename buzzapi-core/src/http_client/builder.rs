use crate::rate_limiter::RateLimiter;
use crate::retry_strategy::RetryStrategy;
use crate::transport::Transport;
use std::sync::Arc;

/// JSON client with throttling and retry support
#[derive(Debug, Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    rate_limiter: RateLimiter,
    retry_strategy: RetryStrategy,
    verbose: bool,
}

impl HttpClient {
    /// Creates a client over `transport`.
    ///
    /// Clones of `rate_limiter` share one bucket, so passing the same limiter
    /// to several clients makes them share one budget.
    pub fn new(
        transport: Arc<dyn Transport>,
        rate_limiter: RateLimiter,
        retry_strategy: RetryStrategy,
    ) -> Self {
        Self {
            transport,
            rate_limiter,
            retry_strategy,
            verbose: false,
        }
    }

    /// Logs request and response bodies at debug level.
    ///
    /// Request bodies are redacted before they are logged.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Returns the shared rate limiter.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(crate) fn retry_strategy(&self) -> &RetryStrategy {
        &self.retry_strategy
    }

    pub(crate) fn verbose(&self) -> bool {
        self.verbose
    }
}
