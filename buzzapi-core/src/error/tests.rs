#![allow(clippy::disallowed_methods)] // unwrap() is acceptable in tests

use super::convert::{MAX_ERROR_MESSAGE_LEN, truncate_message};
use super::*;
use serde_json::json;

fn submission_body() -> serde_json::Value {
    json!({
        "api_app_id": "svc-user",
        "api_app_password": "aHVudGVyMg==",
        "api_request_mode": "async",
        "api_client_request_handle": "42@host-abc",
        "gtid": "900000000"
    })
}

#[test]
fn test_error_is_small() {
    assert!(std::mem::size_of::<Error>() <= 56);
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<Error>();
}

#[test]
fn test_timeout_message_names_message_id() {
    let err = Error::timeout("ABC123");
    assert_eq!(err.to_string(), "Request timed out for: ABC123");
    assert_eq!(err.timed_out_message_id(), Some("ABC123"));
    assert_eq!(err.message_id(), Some("ABC123"));
}

#[test]
fn test_poll_exhausted_message() {
    let last = Error::http(500, "", None);
    let err = Error::poll_exhausted(6, &last);
    assert!(err.to_string().starts_with(POLL_EXHAUSTED_MESSAGE));
    assert!(err.to_string().contains("500"));
    assert!(err.is_poll_exhausted());
}

#[test]
fn test_http_error_falls_back_to_reason() {
    let err = Error::http(400, "", None);
    let details = err.as_http().unwrap();
    assert_eq!(details.reason, "Bad Request");
    assert_eq!(details.body, "Bad Request");
    assert_eq!(err.to_string(), "HTTP error: 400: Bad Request");
}

#[test]
fn test_http_error_keeps_body() {
    let err = Error::http(404, "Not Found", None);
    assert_eq!(err.as_http().unwrap().body, "Not Found");
    assert!(!err.is_retryable());
}

#[test]
fn test_server_errors_are_retryable() {
    assert!(Error::http(503, "", None).is_retryable());
    assert!(Error::network("connection reset").is_retryable());
    assert!(Error::from(NetworkError::Timeout).is_retryable());
    assert!(!Error::from(NetworkError::Ssl("bad cert".into())).is_retryable());
    assert!(!Error::timeout("ABC123").is_retryable());
}

#[test]
fn test_api_error_keeps_raw_payload() {
    let body = json!({"api_result_data": {"api_request_messageid": "ABC123", "api_error_info": {"success": false}}});
    let details = ApiErrorDetails::new(
        ApiErrorScope::Message,
        Some("ABC123".into()),
        json!({"success": false}),
        body.clone(),
    );
    let err = Error::api(details);

    let api = err.as_api().unwrap();
    assert_eq!(api.error_info["success"], false);
    assert_eq!(api.body, body);
    assert_eq!(api.scope, ApiErrorScope::Message);
    assert_eq!(err.message_id(), Some("ABC123"));
}

#[test]
fn test_api_error_redacts_attached_request() {
    let request = RequestSnapshot::new("https://api.example.edu/apiv3/test/test", &submission_body());
    let err = Error::api(
        ApiErrorDetails::new(ApiErrorScope::Submission, None, json!({}), json!({}))
            .with_request(request),
    );

    let attached = err.request().unwrap();
    assert_eq!(attached.body()["api_app_password"], REDACTED);
    assert_eq!(attached.body()["gtid"], "900000000");
    assert!(!format!("{err:?}").contains("aHVudGVyMg=="));
    assert!(!err.report().contains("aHVudGVyMg=="));
}

#[test]
fn test_redaction_covers_every_credential_field() {
    let mut body = json!({
        "api_app_password": "a",
        "api_user_password": "b",
        "password_base64": "c",
        "nested": {"api_user_password": "d"},
        "list": [{"password_base64": "e"}]
    });
    redact_credentials(&mut body);

    assert_eq!(body["api_app_password"], REDACTED);
    assert_eq!(body["api_user_password"], REDACTED);
    assert_eq!(body["password_base64"], REDACTED);
    assert_eq!(body["nested"]["api_user_password"], REDACTED);
    assert_eq!(body["list"][0]["password_base64"], REDACTED);
}

#[test]
fn test_redaction_leaves_absent_fields_absent() {
    let mut body = json!({"api_app_id": "svc-user", "api_user_password": null});
    redact_credentials(&mut body);
    assert!(body.get("api_app_password").is_none());
    assert!(body["api_user_password"].is_null());
}

#[test]
fn test_context_penetration() {
    let err = Error::timeout("ABC123").context("waiting for directory/lookup");
    assert_eq!(err.to_string(), "waiting for directory/lookup");
    assert_eq!(err.timed_out_message_id(), Some("ABC123"));
    assert!(matches!(err.root_cause(), Error::Timeout { .. }));
    assert!(err.report().contains("Caused by: Request timed out for: ABC123"));
}

#[test]
fn test_option_context_is_missing_field() {
    let value = json!({});
    let result: Result<&str> = value
        .get("api_app_ticket")
        .and_then(|v| v.as_str())
        .context("api_app_ticket");
    let err = result.unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    assert!(err.to_string().contains("api_app_ticket"));
}

#[test]
fn test_serde_error_converts_to_parse() {
    let err: Error = serde_json::from_str::<serde_json::Value>("not json")
        .unwrap_err()
        .into();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn test_truncate_message() {
    let short = truncate_message("short".to_string());
    assert_eq!(short, "short");

    let long = truncate_message("é".repeat(MAX_ERROR_MESSAGE_LEN));
    assert!(long.ends_with("... (truncated)"));
    assert!(long.len() <= MAX_ERROR_MESSAGE_LEN + "... (truncated)".len());
}

#[test]
fn test_config_error_converts_to_invalid_request() {
    let err: Error = ConfigValidationError::missing("credentials").into();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert!(err.to_string().contains("credentials"));
}
