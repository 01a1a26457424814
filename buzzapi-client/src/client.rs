//! The public client handle.

use crate::engine::Engine;
use crate::options::PostOptions;
use buzzapi_core::config::ClientConfig;
use buzzapi_core::error::Result;
use buzzapi_core::transport::{ReqwestTransport, Transport};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// A BuzzAPI client.
///
/// Cheap to clone; clones share one engine, so they share the submission
/// ceiling, the outbound throttle, the session ticket and the poll loop.
/// Any number of tasks may call [`post`](Self::post) concurrently.
///
/// # Example
///
/// ```no_run
/// use buzzapi_client::BuzzApi;
/// use buzzapi_core::config::ClientConfig;
/// use serde_json::json;
///
/// # async fn example() -> buzzapi_core::Result<()> {
/// let config = ClientConfig::builder()
///     .credentials("svc-directory", "hunter2")
///     .build()?;
/// let client = BuzzApi::new(config)?;
///
/// let person = client
///     .post("central.iam.gted.people", "search", &json!({"username": "gburdell3"}))
///     .await?;
/// println!("{person}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BuzzApi {
    engine: Arc<Engine>,
}

impl BuzzApi {
    /// Validates `config` and builds a client on the default HTTP transport.
    ///
    /// Validation warnings are logged; validation errors are returned.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.http)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Builds a client that sends every call through `transport`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let report = config.validate()?;
        for warning in &report.warnings {
            warn!(warning = %warning, "Client configuration");
        }
        info!(
            server = %config.server,
            mode = %config.mode,
            app_id = config.credentials.app_id(),
            max_concurrent_submissions = config.max_concurrent_submissions,
            "BuzzAPI client ready"
        );
        Ok(Self {
            engine: Arc::new(Engine::new(config, transport)),
        })
    }

    /// Calls `operation` on `resource` and returns the result data.
    ///
    /// `payload` must be a JSON object (or `null`); its fields are sent
    /// alongside the credentials and override them on conflict.
    pub async fn post(&self, resource: &str, operation: &str, payload: &Value) -> Result<Value> {
        self.post_with(resource, operation, payload, PostOptions::default())
            .await
    }

    /// Like [`post`](Self::post), with per-call options.
    ///
    /// With [`PostOptions::paged`], every page is fetched in turn and the
    /// pages' data are concatenated into one array.
    pub async fn post_with(
        &self,
        resource: &str,
        operation: &str,
        payload: &Value,
        options: PostOptions,
    ) -> Result<Value> {
        self.engine.post(resource, operation, payload, options).await
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.engine.config
    }

    /// Async requests accepted by the server and still waiting for a result.
    pub fn outstanding(&self) -> usize {
        self.engine.outstanding()
    }

    /// Submissions currently holding a dispatcher slot.
    pub fn in_flight(&self) -> usize {
        self.engine.dispatcher.in_flight()
    }

    /// Callers waiting for a dispatcher slot.
    pub fn queued(&self) -> usize {
        self.engine.dispatcher.queued()
    }

    /// The most recent session ticket received from the server.
    pub fn session_ticket(&self) -> Option<String> {
        self.engine.session_ticket()
    }

    /// Whether the poll loop is currently running.
    pub fn is_polling(&self) -> bool {
        self.engine.is_polling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buzzapi_core::credentials::Credentials;
    use buzzapi_core::error::Error;
    use buzzapi_core::testing::{MockReply, MockTransport};
    use serde_json::json;

    fn config() -> ClientConfig {
        let mut config = ClientConfig::new(Credentials::new("svc-user", "hunter2"));
        config.server = "http://buzz/apiv3".into();
        config.mode = buzzapi_core::RequestMode::Sync;
        config
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.max_concurrent_submissions = 0;
        let err = BuzzApi::with_transport(config, Arc::new(MockTransport::new())).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_clones_share_one_engine() {
        let transport = MockTransport::new()
            .on_always("/test/test", MockReply::ok(json!({"api_result_data": 7})));
        let client = BuzzApi::with_transport(config(), Arc::new(transport.clone())).unwrap();
        let other = client.clone();

        assert_eq!(client.post("test", "test", &json!({})).await.unwrap(), 7);
        assert_eq!(other.post("test", "test", &Value::Null).await.unwrap(), 7);

        assert!(Arc::ptr_eq(&client.engine, &other.engine));
        assert_eq!(transport.call_count(), 2);
        assert_eq!(client.in_flight(), 0);
        assert_eq!(client.queued(), 0);
        assert_eq!(client.outstanding(), 0);
        assert!(!client.is_polling());
    }
}
