use crate::error::{ConfigValidationError, ValidationResult};
use std::time::Duration;

/// Proxy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy URL (e.g., "http://127.0.0.1:8080").
    pub url: String,
    /// Optional username for authentication.
    pub username: Option<String>,
    /// Optional password for authentication.
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Create a new proxy configuration with just a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Set credentials for the proxy.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-call timeout. Must outlast the poll wait hint, since the server
    /// holds a poll open for up to that long.
    pub timeout: Duration,
    /// TCP connection timeout (default: 10 seconds)
    pub connect_timeout: Duration,
    /// Log request and response bodies at debug level (credentials redacted)
    pub verbose: bool,
    /// User-Agent header value
    pub user_agent: String,
    /// Optional proxy configuration
    pub proxy: Option<ProxyConfig>,
    /// Maximum response body size in bytes (default: 10MB)
    pub max_response_size: usize,
    /// Maximum number of idle connections per host in the connection pool.
    ///
    /// Default: 10
    pub pool_max_idle_per_host: usize,
    /// Timeout for idle connections in the pool.
    ///
    /// Default: 90 seconds
    pub pool_idle_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            verbose: false,
            user_agent: concat!("buzzapi-rust/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy: None,
            max_response_size: 10 * 1024 * 1024,
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl HttpConfig {
    /// Validates the transport configuration.
    ///
    /// - `timeout` > 10 minutes returns an error
    /// - `timeout` < 1 second generates a warning
    /// - `max_response_size` of zero returns an error
    ///
    /// ```rust
    /// use buzzapi_core::http_client::HttpConfig;
    /// use std::time::Duration;
    ///
    /// assert!(HttpConfig::default().validate().is_ok());
    ///
    /// let invalid = HttpConfig {
    ///     timeout: Duration::from_secs(3600),
    ///     ..Default::default()
    /// };
    /// assert!(invalid.validate().is_err());
    /// ```
    pub fn validate(&self) -> std::result::Result<ValidationResult, ConfigValidationError> {
        let mut warnings = Vec::new();

        if self.timeout > Duration::from_secs(600) {
            return Err(ConfigValidationError::too_high(
                "http.timeout",
                format!("{:?}", self.timeout),
                "10 minutes",
            ));
        }

        if self.timeout < Duration::from_secs(1) {
            warnings.push(format!(
                "timeout {:?} is very short, may cause frequent timeouts",
                self.timeout
            ));
        }

        if self.max_response_size == 0 {
            return Err(ConfigValidationError::invalid(
                "http.max_response_size",
                "max_response_size cannot be zero",
            ));
        }

        Ok(ValidationResult::with_warnings(warnings))
    }
}
