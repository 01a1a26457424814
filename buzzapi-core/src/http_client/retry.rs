use crate::error::Result;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::builder::HttpClient;

impl HttpClient {
    pub(crate) async fn execute_with_retry<F, Fut>(&self, operation: F) -> Result<Value>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Value>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(response) => {
                    debug!(attempt, "HTTP call completed");
                    return Ok(response);
                }
                Err(e) => {
                    if self.retry_strategy().should_retry(&e, attempt) {
                        let delay = self.retry_strategy().calculate_delay(attempt);

                        warn!(
                            attempt,
                            delay_ms = %delay.as_millis(),
                            error = %e,
                            is_retryable = e.is_retryable(),
                            "HTTP call failed, retrying after delay"
                        );

                        tokio::time::sleep(delay).await;
                    } else {
                        error!(
                            attempt,
                            error = %e,
                            is_retryable = e.is_retryable(),
                            "HTTP call failed, not retrying"
                        );
                        return Err(e);
                    }
                }
            }
        }
    }
}
