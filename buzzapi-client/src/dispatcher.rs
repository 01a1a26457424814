//! Submission dispatcher.
//!
//! Bounds how many submissions are in flight. Callers beyond the ceiling
//! wait in arrival order. A slot is held from admission until the
//! submission reply has been interpreted; an async request waiting for its
//! poll result does not hold one.

use crate::correlation::PendingRequest;
use crate::engine::Engine;
use crate::envelope::{self, Page, SubmitReply};
use buzzapi_core::error::{ApiErrorDetails, ApiErrorScope, Error, RequestSnapshot, Result};
use buzzapi_core::request_handle::new_handle;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, instrument};

pub(crate) const PAGING_CURSOR: &str = "api_paging_cursor";
const REQUEST_HANDLE: &str = "api_client_request_handle";

/// FIFO-fair concurrency ceiling for submissions.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    permits: Semaphore,
    capacity: usize,
    queued: AtomicUsize,
}

/// Decrements the queue counter however the wait ends.
struct Queued<'a>(&'a AtomicUsize);

impl Drop for Queued<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Dispatcher {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            permits: Semaphore::new(capacity),
            capacity,
            queued: AtomicUsize::new(0),
        }
    }

    /// Waits for a submission slot. The slot is released when the returned
    /// permit is dropped.
    pub(crate) async fn admit(&self) -> Result<SemaphorePermit<'_>> {
        self.queued.fetch_add(1, Ordering::SeqCst);
        let _queued = Queued(&self.queued);
        self.permits
            .acquire()
            .await
            .map_err(|_| Error::cancelled("submission dispatcher closed"))
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    pub(crate) fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}

fn receive_timeout_ms(engine: &Engine) -> u64 {
    u64::try_from(engine.config.receive_timeout.as_millis()).unwrap_or(u64::MAX)
}

impl Engine {
    /// Builds the submission body: credentials, mode, and receive timeout,
    /// overlaid by the caller payload, then the request handle and cursor.
    pub(crate) fn submission_body(&self, payload: &Value, cursor: Option<&str>) -> Result<Value> {
        let mut body = Map::new();
        let credentials = &self.config.credentials;
        body.insert("api_app_id".into(), credentials.app_id().into());
        body.insert(
            "api_app_password".into(),
            credentials.encoded_password().expose_secret().into(),
        );
        body.insert("api_request_mode".into(), self.config.mode.as_str().into());
        body.insert("api_receive_timeout".into(), receive_timeout_ms(self).into());

        match payload {
            Value::Object(fields) => {
                body.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Value::Null => {}
            other => {
                return Err(Error::invalid_request(format!(
                    "payload must be a JSON object, got {other}"
                )));
            }
        }

        if !body.get(REQUEST_HANDLE).is_some_and(Value::is_string) {
            body.insert(REQUEST_HANDLE.into(), new_handle().into());
        }
        if let Some(cursor) = cursor {
            body.insert(PAGING_CURSOR.into(), cursor.into());
        }

        Ok(Value::Object(body))
    }

    /// Submits one request and waits for its result.
    ///
    /// In sync mode the result is in the submission reply. In async mode the
    /// request is registered under its message id, the poll loop is started
    /// if idle, the submission slot is released, and the call waits for the
    /// poll loop to deliver an outcome.
    #[instrument(name = "submit", skip(self, payload))]
    pub(crate) async fn submit(
        self: &Arc<Self>,
        resource: &str,
        operation: &str,
        payload: &Value,
        cursor: Option<&str>,
    ) -> Result<Page> {
        if resource.is_empty() || operation.is_empty() {
            return Err(Error::invalid_request(
                "resource and operation must not be empty",
            ));
        }
        let body = self.submission_body(payload, cursor)?;
        let url = self.config.endpoint(&format!("{resource}/{operation}"));

        let slot = self.dispatcher.admit().await?;
        debug!(
            in_flight = self.dispatcher.in_flight(),
            queued = self.dispatcher.queued(),
            "Submission admitted"
        );

        let reply = self.http.post_json(&url, &body).await?;

        let completion = match envelope::classify_submit(&reply, self.config.mode)? {
            SubmitReply::Error {
                message_id,
                error_info,
            } => {
                let details =
                    ApiErrorDetails::new(ApiErrorScope::Submission, message_id, error_info, reply)
                        .with_request(RequestSnapshot::new(url, &body));
                return Err(Error::api(details));
            }
            SubmitReply::Result(page) => {
                debug!("Sync result received");
                return Ok(page);
            }
            SubmitReply::Accepted { message_id, ticket } => {
                let (pending, completion) = PendingRequest::new(resource, operation);
                {
                    let mut state = self.state.lock();
                    if ticket.is_some() {
                        state.ticket = ticket;
                    }
                    state.table.register(message_id.clone(), pending);
                }
                info!(message_id = %message_id, "Request accepted, awaiting result");
                completion
            }
        };

        drop(slot);
        self.trigger_poll();

        completion
            .await
            .map_err(|_| Error::cancelled("engine dropped the request without an outcome"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buzzapi_core::config::{ClientConfig, RequestMode};
    use buzzapi_core::credentials::Credentials;
    use buzzapi_core::error::REDACTED;
    use buzzapi_core::testing::{MockReply, MockTransport};
    use serde_json::json;
    use std::time::Duration;

    fn engine(mode: RequestMode, transport: &MockTransport) -> Arc<Engine> {
        let mut config = ClientConfig::new(Credentials::new("svc-user", "hunter2"));
        config.server = "http://buzz/apiv3".into();
        config.mode = mode;
        config.retry_config = buzzapi_core::retry_strategy::RetryConfig::disabled();
        Arc::new(Engine::new(config, Arc::new(transport.clone())))
    }

    #[test]
    fn test_submission_body_layout() {
        let engine = engine(RequestMode::Async, &MockTransport::new());
        let body = engine
            .submission_body(&json!({"gtid": "900000000"}), Some("START"))
            .unwrap();

        assert_eq!(body["api_app_id"], "svc-user");
        assert_eq!(body["api_app_password"], "aHVudGVyMg==");
        assert_eq!(body["api_request_mode"], "async");
        assert_eq!(body["api_receive_timeout"], 900_000);
        assert_eq!(body["gtid"], "900000000");
        assert_eq!(body[PAGING_CURSOR], "START");
        assert!(body[REQUEST_HANDLE].as_str().unwrap().contains('@'));
    }

    #[test]
    fn test_submission_body_keeps_caller_handle() {
        let engine = engine(RequestMode::Sync, &MockTransport::new());
        let body = engine
            .submission_body(&json!({"api_client_request_handle": "mine"}), None)
            .unwrap();
        assert_eq!(body[REQUEST_HANDLE], "mine");
        assert!(body.get(PAGING_CURSOR).is_none());
    }

    #[test]
    fn test_submission_body_rejects_non_object_payload() {
        let engine = engine(RequestMode::Sync, &MockTransport::new());
        let err = engine.submission_body(&json!(["x"]), None).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(engine.submission_body(&Value::Null, None).is_ok());
    }

    #[tokio::test]
    async fn test_sync_submission_returns_result_and_frees_slot() {
        let transport = MockTransport::new().on(
            "/apiv3/test/test",
            MockReply::ok(json!({"api_result_data": {"success": true}})),
        );
        let engine = engine(RequestMode::Sync, &transport);

        let page = engine.submit("test", "test", &json!({}), None).await.unwrap();

        assert_eq!(page.data["success"], true);
        assert_eq!(engine.dispatcher.in_flight(), 0);
        assert_eq!(engine.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_submission_error_carries_redacted_request() {
        let transport = MockTransport::new().on(
            "/apiv3/test/test",
            MockReply::ok(json!({"api_error_info": {"success": false}})),
        );
        let engine = engine(RequestMode::Sync, &transport);

        let err = engine.submit("test", "test", &json!({}), None).await.unwrap_err();

        let api = err.as_api().unwrap();
        assert_eq!(api.scope, ApiErrorScope::Submission);
        assert_eq!(api.error_info["success"], false);
        assert!(api.body.is_object());
        assert_eq!(err.request().unwrap().body()["api_app_password"], REDACTED);
        assert_eq!(engine.dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_http_failure_frees_slot() {
        let transport = MockTransport::new().on("/apiv3/test/test", MockReply::status(404, "Not Found"));
        let engine = engine(RequestMode::Sync, &transport);

        let err = engine.submit("test", "test", &json!({}), None).await.unwrap_err();

        assert_eq!(err.as_http().unwrap().body, "Not Found");
        assert_eq!(engine.dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_empty_resource_is_rejected_without_a_call() {
        let transport = MockTransport::new();
        let engine = engine(RequestMode::Sync, &transport);

        let err = engine.submit("", "test", &json!({}), None).await.unwrap_err();

        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_bounds_concurrency_and_everyone_completes() {
        let transport = MockTransport::new()
            .with_latency(Duration::from_millis(50))
            .with_handler(|req| {
                MockReply::ok(json!({"api_result_data": req.body["n"].clone()}))
            });
        let engine = engine(RequestMode::Sync, &transport);

        let calls: Vec<_> = (0..25)
            .map(|n| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.submit("test", "test", &json!({"n": n}), None).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(engine.dispatcher.in_flight(), 20);
        assert_eq!(engine.dispatcher.queued(), 5);

        let mut results = Vec::new();
        for call in calls {
            results.push(call.await.unwrap().unwrap().data);
        }

        assert_eq!(results, (0..25).map(|n| json!(n)).collect::<Vec<_>>());
        assert!(transport.max_concurrency() <= 20);
        assert_eq!(transport.call_count(), 25);
        assert_eq!(engine.dispatcher.in_flight(), 0);
        assert_eq!(engine.dispatcher.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_waiters_do_not_hold_submission_slots() {
        let transport = MockTransport::new()
            .on_always("/api.my_messages", MockReply::ok(json!({"api_result_data": {}})))
            .with_handler(|req| {
                MockReply::ok(json!({"api_result_data": format!("M{}", req.body["n"])}))
            });
        let mut config = ClientConfig::new(Credentials::new("svc-user", "hunter2"));
        config.server = "http://buzz/apiv3".into();
        config.mode = RequestMode::Async;
        config.max_concurrent_submissions = 2;
        config.receive_timeout = Duration::from_secs(10);
        config.retry_config = buzzapi_core::retry_strategy::RetryConfig::disabled();
        let engine = Arc::new(Engine::new(config, Arc::new(transport.clone())));

        let calls: Vec<_> = (0..5)
            .map(|n| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.submit("test", "test", &json!({"n": n}), None).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(engine.outstanding(), 5);
        assert_eq!(engine.dispatcher.in_flight(), 0);
        assert_eq!(engine.dispatcher.queued(), 0);
        assert_eq!(transport.calls_to("/test/test").len(), 5);

        for (n, call) in calls.into_iter().enumerate() {
            let err = call.await.unwrap().unwrap_err();
            assert_eq!(err.timed_out_message_id(), Some(format!("M{n}").as_str()));
        }
        assert_eq!(engine.outstanding(), 0);
    }
}
