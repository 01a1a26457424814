use crate::error::{Error, RequestSnapshot, Result};
use crate::transport::HttpResponse;
use serde_json::Value;
use tracing::{debug, error};

use super::builder::HttpClient;

const BODY_PREVIEW_SIZE: usize = 200;

fn preview(body: &[u8]) -> String {
    let end = body.len().min(BODY_PREVIEW_SIZE);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

impl HttpClient {
    pub(crate) fn process_response(
        &self,
        response: HttpResponse,
        url: &str,
        request_body: &Value,
    ) -> Result<Value> {
        debug!(
            status = response.status,
            body_length = response.body.len(),
            body_preview = %preview(&response.body),
            "HTTP response received"
        );

        if !response.is_success() {
            let body_text = String::from_utf8_lossy(&response.body).into_owned();
            let err = Error::http(
                response.status,
                body_text,
                Some(RequestSnapshot::new(url, request_body)),
            );
            error!(
                status = response.status,
                error = %err,
                body_preview = %preview(&response.body),
                "HTTP error response"
            );
            return Err(err);
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            error!(
                error = %e,
                body_preview = %preview(&response.body),
                "Response body is not JSON"
            );
            Error::from(e)
        })
    }
}
