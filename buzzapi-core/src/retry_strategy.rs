//! Transport-level retry strategy.
//!
//! Decides whether a failed HTTP attempt is repeated and how long to wait
//! first. This sits below the poll scheduler's own backoff: a poll call only
//! counts as failed once every transport attempt for it has failed.
//!
//! - Fixed delay
//! - Exponential backoff (default, factor 2)
//! - Linear backoff
//! - Proportional jitter

use crate::error::{ConfigValidationError, Error, ValidationResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry strategy type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategyType {
    /// Wait a constant duration between retries.
    Fixed,
    /// Delay doubles with each retry (base_delay * 2^(attempt-1)).
    Exponential,
    /// Delay grows linearly (base_delay * attempt).
    Linear,
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Type of retry strategy to use.
    pub strategy_type: RetryStrategyType,
    /// Base delay in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds.
    pub max_delay_ms: u64,
    /// Whether to retry connection-level failures.
    pub retry_on_network_error: bool,
    /// Whether to retry 5xx responses. Off by default: a submission that
    /// reached the server may already have been executed.
    pub retry_on_server_error: bool,
    /// Jitter factor (0.0-1.0); up to `delay * jitter_factor` is added.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            strategy_type: RetryStrategyType::Exponential,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            retry_on_network_error: true,
            retry_on_server_error: false,
            jitter_factor: 1.0,
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Validates the retry configuration parameters.
    ///
    /// ```rust
    /// use buzzapi_core::retry_strategy::RetryConfig;
    ///
    /// assert!(RetryConfig::default().validate().is_ok());
    ///
    /// let too_many = RetryConfig { max_retries: 15, ..Default::default() };
    /// assert!(too_many.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<ValidationResult, ConfigValidationError> {
        let mut result = ValidationResult::new();

        if self.max_retries > 10 {
            return Err(ConfigValidationError::too_high(
                "retry_config.max_retries",
                self.max_retries,
                10,
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigValidationError::invalid(
                "retry_config.jitter_factor",
                format!("{} is outside 0.0..=1.0", self.jitter_factor),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigValidationError::too_low(
                "retry_config.max_delay_ms",
                self.max_delay_ms,
                self.base_delay_ms,
            ));
        }
        if self.max_retries > 0 && self.base_delay_ms < 10 {
            result.add_warning(format!(
                "retry base delay of {}ms may hammer a struggling server",
                self.base_delay_ms
            ));
        }

        Ok(result)
    }
}

/// Retry strategy.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
}

impl RetryStrategy {
    /// Creates a new retry strategy with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Determines whether a failed attempt should be repeated.
    ///
    /// `attempt` is the number of attempts that have failed so far (1-based).
    pub fn should_retry(&self, error: &Error, attempt: u32) -> bool {
        if attempt > self.config.max_retries {
            return false;
        }
        match error.root_cause() {
            Error::Network(ne) => self.config.retry_on_network_error && ne.is_retryable(),
            Error::Http(details) => self.config.retry_on_server_error && details.is_server_error(),
            _ => false,
        }
    }

    /// Calculates the delay before the next attempt.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = match self.config.strategy_type {
            RetryStrategyType::Fixed => self.config.base_delay_ms,
            RetryStrategyType::Exponential => self
                .config
                .base_delay_ms
                .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1))),
            RetryStrategyType::Linear => {
                self.config.base_delay_ms.saturating_mul(u64::from(attempt))
            }
        };

        let mut delay = base_delay.min(self.config.max_delay_ms);
        if self.config.jitter_factor > 0.0 {
            delay = self.apply_jitter(delay);
        }

        Duration::from_millis(delay)
    }

    fn apply_jitter(&self, delay_ms: u64) -> u64 {
        #[allow(clippy::cast_precision_loss)]
        #[allow(clippy::cast_possible_truncation)]
        let jitter_range = (delay_ms as f64 * self.config.jitter_factor) as u64;
        let jitter = rand::rng().random_range(0..=jitter_range);
        delay_ms.saturating_add(jitter)
    }

    /// Returns a reference to the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
