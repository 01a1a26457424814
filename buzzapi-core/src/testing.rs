//! Scripted in-memory transport for tests.
//!
//! [`MockTransport`] answers POSTs from replies registered per URL suffix,
//! records every call it receives, and tracks how many calls overlapped.
//!
//! ```rust
//! use buzzapi_core::testing::{MockReply, MockTransport};
//! use serde_json::json;
//!
//! let transport = MockTransport::new()
//!     .on("/test/test", MockReply::ok(json!({"api_result_data": "ABC123"})))
//!     .on_always("/api.my_messages", MockReply::ok(json!({"api_result_data": {}})));
//! assert_eq!(transport.call_count(), 0);
//! ```

use crate::error::{Error, Result};
use crate::transport::{HttpResponse, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A call received by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Full request URL
    pub url: String,
    /// Request body decoded as JSON (`Null` if it was not JSON)
    pub body: Value,
}

/// What [`MockTransport`] does with a call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this response.
    Response(HttpResponse),
    /// Fail before any status is received.
    NetworkError(String),
    /// Wait, then apply the inner reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    /// 200 with a JSON body.
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    /// Any status with a JSON body.
    pub fn json(status: u16, body: Value) -> Self {
        Self::Response(HttpResponse::new(status, body.to_string()))
    }

    /// Any status with a plain-text body.
    pub fn status(status: u16, body: &str) -> Self {
        Self::Response(HttpResponse::new(status, body))
    }

    /// A connection-level failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError(message.into())
    }

    /// Delays this reply by `delay`.
    #[must_use]
    pub fn after(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

type Handler = Arc<dyn Fn(&MockRequest) -> MockReply + Send + Sync>;

struct Route {
    suffix: String,
    queue: VecDeque<MockReply>,
    sticky: Option<MockReply>,
}

#[derive(Default)]
struct State {
    routes: Vec<Route>,
    calls: Vec<MockRequest>,
}

/// Scripted [`Transport`].
///
/// Replies registered with [`on`](Self::on) are used once each, in order.
/// A reply registered with [`on_always`](Self::on_always) answers every call
/// once the queue for that suffix is empty. Calls that match nothing go to
/// the handler, if any, and otherwise get a 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
    handler: Option<Handler>,
    latency: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Creates a transport with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    fn route(&self, suffix: &str, f: impl FnOnce(&mut Route)) {
        let mut state = self.state.lock();
        if let Some(route) = state.routes.iter_mut().find(|r| r.suffix == suffix) {
            f(route);
        } else {
            let mut route = Route {
                suffix: suffix.to_string(),
                queue: VecDeque::new(),
                sticky: None,
            };
            f(&mut route);
            state.routes.push(route);
        }
    }

    /// Queues a one-shot reply for URLs ending in `suffix`.
    #[must_use]
    pub fn on(self, suffix: &str, reply: MockReply) -> Self {
        self.route(suffix, |r| r.queue.push_back(reply));
        self
    }

    /// Sets the reply used for `suffix` once its queue is drained.
    #[must_use]
    pub fn on_always(self, suffix: &str, reply: MockReply) -> Self {
        self.route(suffix, |r| r.sticky = Some(reply));
        self
    }

    /// Answers unscripted calls with `handler`.
    #[must_use]
    pub fn with_handler(
        mut self,
        handler: impl Fn(&MockRequest) -> MockReply + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Delays every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues another one-shot reply after construction.
    pub fn push(&self, suffix: &str, reply: MockReply) {
        self.route(suffix, |r| r.queue.push_back(reply));
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<MockRequest> {
        self.state.lock().calls.clone()
    }

    /// Calls whose URL ends in `suffix`.
    pub fn calls_to(&self, suffix: &str) -> Vec<MockRequest> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.url.ends_with(suffix))
            .cloned()
            .collect()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, request: &MockRequest) -> MockReply {
        let scripted = {
            let mut state = self.state.lock();
            state.calls.push(request.clone());
            state
                .routes
                .iter_mut()
                .filter(|r| request.url.ends_with(&r.suffix))
                .find_map(|r| r.queue.pop_front().or_else(|| r.sticky.clone()))
        };

        scripted
            .or_else(|| self.handler.as_ref().map(|h| h(request)))
            .unwrap_or_else(|| MockReply::status(404, "no mock registered"))
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.call_count())
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<HttpResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        let request = MockRequest {
            url: url.to_string(),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        };
        let mut reply = self.next_reply(&request);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        loop {
            match reply {
                MockReply::Response(response) => return Ok(response),
                MockReply::NetworkError(message) => return Err(Error::network(message)),
                MockReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}
