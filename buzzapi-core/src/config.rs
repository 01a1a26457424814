//! Client configuration.
//!
//! [`ClientConfig`] gathers every tunable of the engine: where the server
//! lives, how to authenticate, how many submissions may be in flight, how
//! fast calls may be issued, and how the poll loop backs off. Build one with
//! [`ClientConfig::builder`] or load it from the environment with
//! [`ClientConfig::from_env`].

use crate::credentials::Credentials;
use crate::error::{ConfigValidationError, ValidationResult};
use crate::http_client::{HttpConfig, ProxyConfig};
use crate::rate_limiter::RateLimiterConfig;
use crate::retry_strategy::RetryConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default API root.
pub const DEFAULT_SERVER: &str = "https://api.gatech.edu/apiv3";

/// Upper bound on `max_concurrent_submissions`.
pub const MAX_CONCURRENT_SUBMISSIONS: usize = 1000;

/// How the server is asked to answer a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// The result comes back in the submission reply.
    Sync,
    /// The submission returns a message id; the result is polled for.
    #[default]
    Async,
}

impl RequestMode {
    /// The value sent as `api_request_mode`.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMode::Sync => "sync",
            RequestMode::Async => "async",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root; submissions go to `{server}/{resource}/{operation}`.
    pub server: String,
    /// Application credentials.
    pub credentials: Credentials,
    /// Sync or async submissions.
    pub mode: RequestMode,
    /// How long a pending request may wait for its result. Also sent to the
    /// server as `api_receive_timeout`.
    pub receive_timeout: Duration,
    /// Submissions allowed in flight at once.
    pub max_concurrent_submissions: usize,
    /// Outbound call throttle shared by submissions and polls.
    pub rate_limit: RateLimiterConfig,
    /// How long the server may hold a poll open waiting for results.
    pub poll_wait_hint: Duration,
    /// Lower bound of the poll backoff.
    pub poll_backoff_min: Duration,
    /// Upper bound (exclusive) of the poll backoff.
    pub poll_backoff_max: Duration,
    /// Consecutive failed polls tolerated before every pending request is
    /// rejected.
    pub poll_failure_budget: u32,
    /// Transport-level retries for each HTTP call.
    pub retry_config: RetryConfig,
    /// Transport settings.
    pub http: HttpConfig,
}

impl ClientConfig {
    /// Defaults for everything except the credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            credentials,
            mode: RequestMode::Async,
            receive_timeout: Duration::from_millis(900_000),
            max_concurrent_submissions: 20,
            rate_limit: RateLimiterConfig::default(),
            poll_wait_hint: Duration::from_millis(5000),
            poll_backoff_min: Duration::from_millis(1000),
            poll_backoff_max: Duration::from_millis(5000),
            poll_failure_budget: 5,
            retry_config: RetryConfig::default(),
            http: HttpConfig::default(),
        }
    }

    /// Create a new configuration builder
    ///
    /// ```rust
    /// use buzzapi_core::config::{ClientConfig, RequestMode};
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::builder()
    ///     .credentials("svc-directory", "hunter2")
    ///     .mode(RequestMode::Sync)
    ///     .receive_timeout(Duration::from_secs(60))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.max_concurrent_submissions, 20);
    /// ```
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Joins the server root and a path without doubling slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first unusable field. Suboptimal but usable values are
    /// reported as warnings in the returned [`ValidationResult`].
    pub fn validate(&self) -> Result<ValidationResult, ConfigValidationError> {
        let mut result = ValidationResult::new();

        if !(self.server.starts_with("http://") || self.server.starts_with("https://")) {
            return Err(ConfigValidationError::invalid(
                "server",
                format!("'{}' is not an http(s) URL", self.server),
            ));
        }
        if self.credentials.app_id().is_empty() {
            result.add_warning("credentials.app_id is empty, the server will reject submissions");
        }
        if self.receive_timeout.is_zero() {
            return Err(ConfigValidationError::too_low(
                "receive_timeout",
                "0ms",
                "1ms",
            ));
        }
        if self.max_concurrent_submissions == 0 {
            return Err(ConfigValidationError::too_low(
                "max_concurrent_submissions",
                0,
                1,
            ));
        }
        if self.max_concurrent_submissions > MAX_CONCURRENT_SUBMISSIONS {
            return Err(ConfigValidationError::too_high(
                "max_concurrent_submissions",
                self.max_concurrent_submissions,
                MAX_CONCURRENT_SUBMISSIONS,
            ));
        }
        if self.poll_backoff_max < self.poll_backoff_min {
            return Err(ConfigValidationError::too_low(
                "poll_backoff_max",
                format!("{:?}", self.poll_backoff_max),
                format!("{:?}", self.poll_backoff_min),
            ));
        }
        if self.poll_failure_budget == 0 {
            result.add_warning("poll_failure_budget is 0, the first failed poll rejects everything");
        }
        if self.http.timeout <= self.poll_wait_hint {
            result.add_warning(format!(
                "http.timeout {:?} does not outlast poll_wait_hint {:?}",
                self.http.timeout, self.poll_wait_hint
            ));
        }

        result.merge(self.rate_limit.validate()?);
        result.merge(self.retry_config.validate()?);
        result.merge(self.http.validate()?);

        Ok(result)
    }

    /// Loads the configuration from process environment variables.
    ///
    /// | variable                      | field                        |
    /// |-------------------------------|------------------------------|
    /// | `BUZZAPI_USER` (required)     | `credentials.app_id`         |
    /// | `BUZZAPI_PASSWORD` (required) | `credentials.password`       |
    /// | `BUZZAPI_SERVER`              | `server`                     |
    /// | `BUZZAPI_SYNC`                | `mode` (`true`/`1` = sync)   |
    /// | `BUZZAPI_RECEIVE_TIMEOUT_MS`  | `receive_timeout`            |
    /// | `BUZZAPI_MAX_CONCURRENCY`     | `max_concurrent_submissions` |
    /// | `BUZZAPI_PROXY`               | `http.proxy`                 |
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigValidationError> {
        let user = lookup("BUZZAPI_USER").ok_or(ConfigValidationError::missing("BUZZAPI_USER"))?;
        let password =
            lookup("BUZZAPI_PASSWORD").ok_or(ConfigValidationError::missing("BUZZAPI_PASSWORD"))?;

        let mut config = Self::new(Credentials::new(user, password));

        if let Some(server) = lookup("BUZZAPI_SERVER") {
            config.server = server;
        }
        if let Some(sync) = lookup("BUZZAPI_SYNC") {
            config.mode = match sync.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => RequestMode::Sync,
                "0" | "false" | "no" | "" => RequestMode::Async,
                other => {
                    return Err(ConfigValidationError::invalid(
                        "BUZZAPI_SYNC",
                        format!("'{other}' is not a boolean"),
                    ));
                }
            };
        }
        if let Some(ms) = lookup("BUZZAPI_RECEIVE_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                ConfigValidationError::invalid("BUZZAPI_RECEIVE_TIMEOUT_MS", "not an integer")
            })?;
            config.receive_timeout = Duration::from_millis(ms);
        }
        if let Some(limit) = lookup("BUZZAPI_MAX_CONCURRENCY") {
            config.max_concurrent_submissions = limit.trim().parse().map_err(|_| {
                ConfigValidationError::invalid("BUZZAPI_MAX_CONCURRENCY", "not an integer")
            })?;
        }
        if let Some(proxy) = lookup("BUZZAPI_PROXY") {
            config.http.proxy = Some(ProxyConfig::new(proxy));
        }

        Ok(config)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    credentials: Option<Credentials>,
    server: Option<String>,
    mode: Option<RequestMode>,
    receive_timeout: Option<Duration>,
    max_concurrent_submissions: Option<usize>,
    rate_limit: Option<RateLimiterConfig>,
    poll_wait_hint: Option<Duration>,
    poll_backoff: Option<(Duration, Duration)>,
    poll_failure_budget: Option<u32>,
    retry_config: Option<RetryConfig>,
    http: Option<HttpConfig>,
}

impl ClientConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application id and plain-text password
    pub fn credentials(mut self, app_id: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(app_id.into(), password.into()));
        self
    }

    /// Set the API root
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Set sync or async mode
    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Shorthand for `mode(RequestMode::Sync)` when `sync` is true
    pub fn sync(self, sync: bool) -> Self {
        self.mode(if sync {
            RequestMode::Sync
        } else {
            RequestMode::Async
        })
    }

    /// Set the per-request receive timeout
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    /// Set the submission concurrency ceiling
    pub fn max_concurrent_submissions(mut self, limit: usize) -> Self {
        self.max_concurrent_submissions = Some(limit);
        self
    }

    /// Set the outbound throttle
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Set the poll wait hint sent to the server
    pub fn poll_wait_hint(mut self, hint: Duration) -> Self {
        self.poll_wait_hint = Some(hint);
        self
    }

    /// Set the poll backoff range `[min, max)`
    pub fn poll_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.poll_backoff = Some((min, max));
        self
    }

    /// Set how many consecutive poll failures are tolerated
    pub fn poll_failure_budget(mut self, budget: u32) -> Self {
        self.poll_failure_budget = Some(budget);
        self
    }

    /// Set the transport-level retry configuration
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    /// Set the transport configuration
    pub fn http(mut self, config: HttpConfig) -> Self {
        self.http = Some(config);
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Fails if no credentials were given.
    pub fn build(self) -> Result<ClientConfig, ConfigValidationError> {
        let credentials = self
            .credentials
            .ok_or(ConfigValidationError::missing("credentials"))?;
        let mut config = ClientConfig::new(credentials);

        if let Some(server) = self.server {
            config.server = server;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(timeout) = self.receive_timeout {
            config.receive_timeout = timeout;
        }
        if let Some(limit) = self.max_concurrent_submissions {
            config.max_concurrent_submissions = limit;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit = rate_limit;
        }
        if let Some(hint) = self.poll_wait_hint {
            config.poll_wait_hint = hint;
        }
        if let Some((min, max)) = self.poll_backoff {
            config.poll_backoff_min = min;
            config.poll_backoff_max = max;
        }
        if let Some(budget) = self.poll_failure_budget {
            config.poll_failure_budget = budget;
        }
        if let Some(retry_config) = self.retry_config {
            config.retry_config = retry_config;
        }
        if let Some(http) = self.http {
            config.http = http;
        }

        Ok(config)
    }
}
