//! The top-level crate re-exports a working client surface.

use buzzapi::prelude::*;
use std::time::Duration;

#[test]
fn test_version() {
    assert!(!buzzapi::VERSION.is_empty());
}

#[test]
fn test_client_from_builder() {
    let config = ClientConfig::builder()
        .credentials("svc-user", "hunter2")
        .server("http://localhost:9/apiv3")
        .sync(true)
        .receive_timeout(Duration::from_secs(30))
        .max_concurrent_submissions(4)
        .build()
        .unwrap();

    let client = BuzzApi::new(config).unwrap();

    assert_eq!(client.config().mode, RequestMode::Sync);
    assert_eq!(client.config().endpoint("a/b"), "http://localhost:9/apiv3/a/b");
    assert_eq!(client.in_flight(), 0);
    assert!(client.session_ticket().is_none());
}

#[test]
fn test_debug_output_hides_password() {
    let config = ClientConfig::builder()
        .credentials("svc-user", "hunter2")
        .build()
        .unwrap();
    let client = BuzzApi::new(config).unwrap();

    let rendered = format!("{client:?}");
    assert!(rendered.contains("svc-user"));
    assert!(!rendered.contains("hunter2"));
}

#[tokio::test]
async fn test_connection_failure_is_a_network_error() {
    let config = ClientConfig::builder()
        .credentials("svc-user", "hunter2")
        .server("http://127.0.0.1:9/apiv3")
        .sync(true)
        .retry_config(RetryConfig::disabled())
        .build()
        .unwrap();
    let client = BuzzApi::new(config).unwrap();

    let err = client
        .post("test", "test", &serde_json::json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Network(_)));
    assert_eq!(client.in_flight(), 0);
}
