//! The single poll loop.
//!
//! At most one poll loop runs per engine. It is started by the first
//! accepted async submission and stops on its own once no request is
//! outstanding. Each iteration expires stale requests, asks the server for
//! results addressed to every outstanding message id, and routes whatever
//! comes back.

use crate::engine::Engine;
use crate::envelope::{self, PollReply};
use buzzapi_core::error::{ApiErrorDetails, ApiErrorScope, Error, RequestSnapshot, Result};
use buzzapi_core::request_handle::new_handle;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

pub(crate) const POLL_PATH: &str = "api.my_messages";

/// What the loop does after a poll that reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Something was delivered; poll again right away.
    Continue,
    /// Nothing useful arrived; wait before polling again.
    Backoff,
}

/// Body of a poll call.
#[derive(Debug, Serialize)]
struct PollRequest<'a> {
    api_operation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_app_ticket: Option<String>,
    api_pull_response_to: &'a [String],
    api_receive_timeout: u64,
    api_client_request_handle: String,
}

/// A random delay in `[min, max)`, or `min` when the range is empty.
pub(crate) fn backoff_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let lo = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
    let hi = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if hi <= lo {
        return min;
    }
    Duration::from_millis(rand::rng().random_range(lo..hi))
}

impl Engine {
    /// Starts the poll loop unless one is already running or there is
    /// nothing to poll for.
    pub(crate) fn trigger_poll(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.polling || state.table.is_empty() {
                return;
            }
            state.polling = true;
        }
        debug!("Starting poll loop");
        tokio::spawn(Arc::clone(self).poll_loop());
    }

    fn poll_body(&self, ids: &[String], ticket: Option<String>) -> Result<Value> {
        let request = PollRequest {
            api_operation: "read",
            api_app_ticket: ticket,
            api_pull_response_to: ids,
            api_receive_timeout: u64::try_from(self.config.poll_wait_hint.as_millis())
                .unwrap_or(u64::MAX),
            api_client_request_handle: new_handle(),
        };
        Ok(serde_json::to_value(request)?)
    }

    async fn backoff(&self) {
        let delay = backoff_delay(self.config.poll_backoff_min, self.config.poll_backoff_max);
        trace!(delay_ms = delay.as_millis(), "Poll backoff");
        tokio::time::sleep(delay).await;
    }

    async fn poll_loop(self: Arc<Self>) {
        let mut failures: u32 = 0;

        loop {
            let snapshot = {
                let mut state = self.state.lock();
                state.table.expire(self.config.receive_timeout);
                if state.table.is_empty() {
                    state.polling = false;
                    None
                } else {
                    Some((state.table.ids(), state.ticket.clone()))
                }
            };
            let Some((ids, ticket)) = snapshot else {
                debug!("Nothing outstanding, poll loop stopping");
                return;
            };

            match self.poll_once(&ids, ticket).await {
                Ok(Step::Continue) => failures = 0,
                Ok(Step::Backoff) => {
                    failures = 0;
                    self.backoff().await;
                }
                Err(err) => {
                    failures += 1;
                    if failures > self.config.poll_failure_budget {
                        let rejected = self
                            .state
                            .lock()
                            .table
                            .reject_all(|_| Error::poll_exhausted(failures, &err));
                        error!(
                            attempts = failures,
                            rejected,
                            error = %err,
                            "Poll failure budget exhausted, failing every outstanding request"
                        );
                        failures = 0;
                        continue;
                    }
                    warn!(attempt = failures, error = %err, "Poll failed");
                    self.backoff().await;
                }
            }
        }
    }

    /// Issues one poll and routes its reply.
    ///
    /// Only transport and HTTP failures are returned as errors; server
    /// reported errors are delivered to the requests they concern.
    async fn poll_once(&self, ids: &[String], ticket: Option<String>) -> Result<Step> {
        let url = self.config.endpoint(POLL_PATH);
        let body = self.poll_body(ids, ticket)?;
        trace!(outstanding = ids.len(), "Polling");

        let reply = self.http.post_json(&url, &body).await?;

        if let Some(ticket) = envelope::ticket_in(&reply) {
            self.state.lock().ticket = Some(ticket);
        }

        let step = match envelope::classify_poll(&reply) {
            PollReply::NotReady => Step::Backoff,
            PollReply::Success { message_id, page } => {
                let delivered = self.state.lock().table.resolve(&message_id, Ok(page));
                if delivered {
                    debug!(message_id = %message_id, "Result delivered");
                    Step::Continue
                } else {
                    warn!(message_id = %message_id, "Result for unknown message id dropped");
                    Step::Backoff
                }
            }
            PollReply::Error {
                message_id: Some(message_id),
                error_info,
            } => {
                let details = ApiErrorDetails::new(
                    ApiErrorScope::Message,
                    Some(message_id.clone()),
                    error_info,
                    reply,
                )
                .with_request(RequestSnapshot::new(url, &body));
                let delivered = self
                    .state
                    .lock()
                    .table
                    .resolve(&message_id, Err(Error::api(details)));
                if delivered {
                    debug!(message_id = %message_id, "Error delivered");
                    Step::Continue
                } else {
                    warn!(message_id = %message_id, "Error for unknown message id dropped");
                    Step::Backoff
                }
            }
            PollReply::Error {
                message_id: None,
                error_info,
            } => {
                let snapshot = RequestSnapshot::new(url, &body);
                let rejected = self.state.lock().table.reject_all(|_| {
                    Error::api(
                        ApiErrorDetails::new(
                            ApiErrorScope::Session,
                            None,
                            error_info.clone(),
                            reply.clone(),
                        )
                        .with_request(snapshot.clone()),
                    )
                });
                info!(rejected, error_info = %error_info, "Unattributed poll error, failing every outstanding request");
                Step::Continue
            }
            PollReply::Anomaly(reason) => {
                warn!(reason, "Unexpected poll reply ignored");
                Step::Backoff
            }
        };
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::PendingRequest;
    use buzzapi_core::config::ClientConfig;
    use buzzapi_core::credentials::Credentials;
    use buzzapi_core::retry_strategy::RetryConfig;
    use buzzapi_core::testing::{MockReply, MockTransport};
    use serde_json::json;

    const POLL: &str = "/api.my_messages";

    fn engine(transport: &MockTransport, budget: u32) -> Arc<Engine> {
        let mut config = ClientConfig::new(Credentials::new("svc-user", "hunter2"));
        config.server = "http://buzz/apiv3".into();
        config.poll_backoff_min = Duration::from_millis(1000);
        config.poll_backoff_max = Duration::from_millis(5000);
        config.poll_failure_budget = budget;
        config.retry_config = RetryConfig::disabled();
        Arc::new(Engine::new(config, Arc::new(transport.clone())))
    }

    fn register(engine: &Engine, id: &str) -> crate::correlation::Completion {
        let (pending, rx) = PendingRequest::new("test", "test");
        engine.state.lock().table.register(id.to_string(), pending);
        rx
    }

    #[test]
    fn test_backoff_delay_bounds() {
        let min = Duration::from_millis(1000);
        let max = Duration::from_millis(5000);
        for _ in 0..200 {
            let d = backoff_delay(min, max);
            assert!(d >= min && d < max, "{d:?} out of range");
        }
        assert_eq!(backoff_delay(max, max), max);
        assert_eq!(backoff_delay(max, min), max);
    }

    #[test]
    fn test_poll_body_shape() {
        let engine = engine(&MockTransport::new(), 5);
        let body = engine
            .poll_body(&["A".into(), "B".into()], Some("XYZ789".into()))
            .unwrap();
        assert_eq!(body["api_operation"], "read");
        assert_eq!(body["api_pull_response_to"], json!(["A", "B"]));
        assert_eq!(body["api_receive_timeout"], 5000);
        assert_eq!(body["api_app_ticket"], "XYZ789");
        assert!(body.get("api_app_password").is_none());

        let body = engine.poll_body(&["A".into()], None).unwrap();
        assert!(body.get("api_app_ticket").is_none());
    }

    #[tokio::test]
    async fn test_trigger_with_empty_table_does_nothing() {
        let transport = MockTransport::new();
        let engine = engine(&transport, 5);
        engine.trigger_poll();
        assert!(!engine.is_polling());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_ready_backs_off_then_delivers() {
        let transport = MockTransport::new()
            .on(POLL, MockReply::ok(json!({"api_result_data": {}})))
            .on(
                POLL,
                MockReply::ok(json!({
                    "api_result_data": {
                        "api_request_messageid": "ABC123",
                        "api_result_data": {"success": true}
                    }
                })),
            );
        let engine = engine(&transport, 5);
        let rx = register(&engine, "ABC123");
        let started = tokio::time::Instant::now();

        engine.trigger_poll();
        let page = rx.await.unwrap().unwrap();

        let waited = started.elapsed();
        assert_eq!(page.data["success"], true);
        assert!(waited >= Duration::from_millis(1000) && waited < Duration::from_millis(5000));
        assert_eq!(transport.calls_to(POLL).len(), 2);

        tokio::task::yield_now().await;
        assert!(!engine.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_ticket_is_sent_and_updated() {
        let transport = MockTransport::new().on(
            POLL,
            MockReply::ok(json!({
                "api_app_ticket": "NEW",
                "api_result_data": {
                    "api_request_messageid": "ABC123",
                    "api_result_data": 1
                }
            })),
        );
        let engine = engine(&transport, 5);
        engine.state.lock().ticket = Some("OLD".into());
        let rx = register(&engine, "ABC123");

        engine.trigger_poll();
        rx.await.unwrap().unwrap();

        assert_eq!(transport.calls_to(POLL)[0].body["api_app_ticket"], "OLD");
        assert_eq!(engine.session_ticket().as_deref(), Some("NEW"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attributed_error_goes_to_one_request() {
        let transport = MockTransport::new()
            .on(
                POLL,
                MockReply::ok(json!({
                    "api_result_data": {
                        "api_request_messageid": "A",
                        "api_error_info": {"success": false}
                    }
                })),
            )
            .on(
                POLL,
                MockReply::ok(json!({
                    "api_result_data": {"api_request_messageid": "B", "api_result_data": "ok"}
                })),
            );
        let engine = engine(&transport, 5);
        let rx_a = register(&engine, "A");
        let rx_b = register(&engine, "B");

        engine.trigger_poll();

        let err = rx_a.await.unwrap().unwrap_err();
        let api = err.as_api().unwrap();
        assert_eq!(api.scope, ApiErrorScope::Message);
        assert_eq!(api.message_id.as_deref(), Some("A"));
        assert_eq!(rx_b.await.unwrap().unwrap().data, "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unattributed_error_fails_everyone() {
        let transport = MockTransport::new().on(
            POLL,
            MockReply::ok(json!({"api_error_info": {"success": false}})),
        );
        let engine = engine(&transport, 5);
        let rx_a = register(&engine, "A");
        let rx_b = register(&engine, "B");

        engine.trigger_poll();

        for rx in [rx_a, rx_b] {
            let err = rx.await.unwrap().unwrap_err();
            let api = err.as_api().unwrap();
            assert_eq!(api.scope, ApiErrorScope::Session);
            assert_eq!(api.error_info, json!({"success": false}));
            assert_eq!(api.body, json!({"api_error_info": {"success": false}}));
        }
        assert_eq!(engine.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_within_budget_recover() {
        let transport = MockTransport::new()
            .on(POLL, MockReply::status(500, "boom"))
            .on(POLL, MockReply::network("reset"))
            .on(
                POLL,
                MockReply::ok(json!({
                    "api_result_data": {"api_request_messageid": "ABC123", "api_result_data": true}
                })),
            );
        let engine = engine(&transport, 5);
        let rx = register(&engine, "ABC123");

        engine.trigger_poll();

        assert_eq!(rx.await.unwrap().unwrap().data, true);
        assert_eq!(transport.calls_to(POLL).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_budget_exhaustion_rejects_all() {
        let transport = MockTransport::new().on_always(POLL, MockReply::status(500, "boom"));
        let engine = engine(&transport, 5);
        let rx = register(&engine, "ABC123");

        engine.trigger_poll();

        let err = rx.await.unwrap().unwrap_err();
        assert!(err.is_poll_exhausted());
        assert!(err.to_string().starts_with("Failed to get results from BuzzAPI"));
        assert_eq!(transport.calls_to(POLL).len(), 6);
        assert_eq!(engine.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_timeout_expires_request() {
        let transport = MockTransport::new().on_always(POLL, MockReply::ok(json!({"api_result_data": {}})));
        let mut config = ClientConfig::new(Credentials::new("svc-user", "hunter2"));
        config.server = "http://buzz/apiv3".into();
        config.receive_timeout = Duration::from_millis(1);
        let engine = Arc::new(Engine::new(config, Arc::new(transport.clone())));
        let rx = register(&engine, "ABC123");

        engine.trigger_poll();

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Request timed out for: ABC123");
        assert_eq!(err.timed_out_message_id(), Some("ABC123"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_message_id_is_ignored() {
        let transport = MockTransport::new()
            .on(
                POLL,
                MockReply::ok(json!({
                    "api_result_data": {"api_request_messageid": "STALE", "api_result_data": 1}
                })),
            )
            .on(
                POLL,
                MockReply::ok(json!({
                    "api_result_data": {"api_request_messageid": "ABC123", "api_result_data": 2}
                })),
            );
        let engine = engine(&transport, 5);
        let rx = register(&engine, "ABC123");

        engine.trigger_poll();

        assert_eq!(rx.await.unwrap().unwrap().data, 2);
    }
}
