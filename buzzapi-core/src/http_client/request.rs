use crate::error::{Error, RequestSnapshot, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use super::builder::HttpClient;

const JSON_HEADERS: &[(&str, &str)] = &[
    ("content-type", "application/json"),
    ("accept", "application/json"),
];

impl HttpClient {
    /// POSTs `body` as JSON and decodes the JSON reply.
    ///
    /// Every attempt first waits on the rate limiter, so retries are
    /// throttled like any other call.
    ///
    /// # Errors
    ///
    /// - [`Error::Network`] if no status was received after all attempts
    /// - [`Error::Http`] for a non-2xx status, with the redacted request attached
    /// - [`Error::Parse`] if a 2xx body is not JSON
    #[instrument(name = "http_post_json", skip(self, body), fields(url = %url))]
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let encoded = serde_json::to_vec(body)
            .map_err(|e| Error::invalid_request(format!("JSON serialization failed: {e}")))?;

        if self.verbose() {
            debug!(body = %RequestSnapshot::new(url, body).body(), "HTTP request");
        }

        self.execute_with_retry(|| {
            let encoded = encoded.clone();
            async move {
                self.rate_limiter().wait().await;
                let response = self.transport().post(url, JSON_HEADERS, encoded).await?;
                self.process_response(response, url, body)
            }
        })
        .await
    }
}
