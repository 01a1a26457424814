//! Logging system integration tests.
//!
//! Installs the subscriber once and drives real HTTP calls through it with
//! verbose request logging enabled.

use buzzapi_core::prelude::*;
use serde_json::json;
use std::sync::{Arc, Once};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

/// Ensure logging system is initialized only once across tests.
fn setup_logging() {
    INIT.call_once(|| {
        let _ = try_init_logging(&LogConfig::test());
    });
}

fn verbose_client() -> HttpClient {
    let http = HttpConfig {
        verbose: true,
        ..HttpConfig::default()
    };
    let transport = Arc::new(ReqwestTransport::new(&http).unwrap());
    HttpClient::new(
        transport,
        RateLimiter::new(RateLimiterConfig::default()),
        RetryStrategy::new(RetryConfig::disabled()),
    )
    .with_verbose(true)
}

#[test]
fn test_second_init_reports_error() {
    setup_logging();
    assert!(try_init_logging(&LogConfig::test()).is_err());
}

#[tokio::test]
async fn test_verbose_logging_during_calls() {
    setup_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_result_data": "ABC123"})))
        .mount(&server)
        .await;

    let reply = verbose_client()
        .post_json(
            &format!("{}/apiv3/test/test", server.uri()),
            &json!({"api_app_id": "svc-user", "api_app_password": "aHVudGVyMg=="}),
        )
        .await
        .unwrap();

    assert_eq!(reply["api_result_data"], "ABC123");
}

#[tokio::test]
async fn test_error_paths_log_without_panicking() {
    setup_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = verbose_client()
        .post_json(&format!("{}/apiv3/api.my_messages", server.uri()), &json!({}))
        .await
        .unwrap_err();

    tracing::error!(error = %err, "Poll failed");
    assert_eq!(err.as_http().unwrap().status, 503);
}
