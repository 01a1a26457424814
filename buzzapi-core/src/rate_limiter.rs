//! Outbound request throttle.
//!
//! Caps how many HTTP calls the client issues per time window. Submissions
//! and polls draw from the same budget, so one limiter is shared by every
//! call an engine makes.
//!
//! The algorithm is a token bucket refilled in whole windows: the bucket
//! starts full, each call takes one token, and once a full window has passed
//! since the last refill the bucket is topped up again.
//!
//! # Example
//!
//! ```rust
//! use buzzapi_core::rate_limiter::{RateLimiter, RateLimiterConfig};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(RateLimiterConfig::new(333, Duration::from_secs(1)));
//! limiter.wait().await;
//! // issue the HTTP call
//! # }
//! ```

use crate::error::{ConfigValidationError, ValidationResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of calls per window
    pub capacity: u32,
    /// Window length
    pub refill_period: Duration,
}

impl RateLimiterConfig {
    /// Creates a configuration allowing `capacity` calls per `refill_period`.
    pub fn new(capacity: u32, refill_period: Duration) -> Self {
        Self {
            capacity,
            refill_period,
        }
    }

    /// Validates the limiter parameters.
    pub fn validate(&self) -> Result<ValidationResult, ConfigValidationError> {
        let mut result = ValidationResult::new();
        if self.capacity == 0 {
            return Err(ConfigValidationError::invalid(
                "rate_limit.capacity",
                "capacity cannot be zero",
            ));
        }
        if self.refill_period.is_zero() {
            return Err(ConfigValidationError::invalid(
                "rate_limit.refill_period",
                "refill period cannot be zero",
            ));
        }
        if self.refill_period < Duration::from_millis(10) {
            result.add_warning(format!(
                "rate limit window {:?} is very short, throttling will be coarse",
                self.refill_period
            ));
        }
        Ok(result)
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        // 333 calls per second
        Self::new(333, Duration::from_secs(1))
    }
}

#[derive(Debug)]
struct RateLimiterState {
    tokens: u32,
    last_refill: Instant,
    config: RateLimiterConfig,
}

impl RateLimiterState {
    fn new(config: RateLimiterConfig) -> Self {
        Self {
            tokens: config.capacity,
            last_refill: Instant::now(),
            config,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_refill) >= self.config.refill_period {
            self.tokens = self.config.capacity;
            self.last_refill = now;
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Time until the current window closes.
    fn wait_time(&self) -> Duration {
        (self.last_refill + self.config.refill_period).saturating_duration_since(Instant::now())
    }
}

/// Shared token-bucket throttle.
///
/// Cloning is cheap and clones share the same bucket.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateLimiterState>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the given configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimiterState::new(config))),
        }
    }

    /// Waits until a call may be issued, then takes its token.
    pub async fn wait(&self) {
        loop {
            let wait_duration = {
                let mut state = self.state.lock().await;
                if state.try_consume() {
                    return;
                }
                state.wait_time()
            };

            if wait_duration > Duration::ZERO {
                sleep(wait_duration).await;
            } else {
                // Small delay to prevent busy waiting
                sleep(Duration::from_millis(1)).await;
            }
        }
    }

    /// Takes a token if one is available without waiting.
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        state.try_consume()
    }

    /// Returns the number of calls still allowed in the current window.
    pub async fn available_tokens(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.refill();
        state.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_config_default() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.capacity, 333);
        assert_eq!(config.refill_period, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_limiter_config_rejects_zero() {
        let err = RateLimiterConfig::new(0, Duration::from_secs(1))
            .validate()
            .unwrap_err();
        assert_eq!(err.field_name(), "rate_limit.capacity");

        let err = RateLimiterConfig::new(5, Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(err.field_name(), "rate_limit.refill_period");
    }

    #[tokio::test]
    async fn test_rate_limiter_basic() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(5, Duration::from_secs(1)));

        for _ in 0..5 {
            assert!(limiter.try_acquire().await);
        }
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_refills_after_window() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(2, Duration::from_millis(100)));

        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);

        sleep(Duration::from_millis(100)).await;

        assert_eq!(limiter.available_tokens().await, 2);
        assert!(limiter.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_wait_blocks_until_next_window() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(2, Duration::from_millis(100)));

        limiter.wait().await;
        limiter.wait().await;

        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_concurrent_access_shares_bucket() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(10, Duration::from_secs(60)));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.wait().await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(limiter.available_tokens().await, 0);
    }
}
