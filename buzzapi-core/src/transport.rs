//! HTTP transport abstraction.
//!
//! The engine only ever issues JSON POSTs, so the transport surface is a
//! single `post` call. [`ReqwestTransport`] is the production
//! implementation; tests substitute a scripted transport.

use crate::error::{Error, NetworkError, Result};
use crate::http_client::HttpConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::fmt;
use tracing::{error, warn};

/// A raw HTTP response.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Builds a response from a status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP POST.
///
/// Implementations own connection pooling and TLS. A non-2xx status is not
/// an error at this layer; only failures that prevent a status from being
/// received are.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `body` to `url` with the given headers.
    async fn post(&self, url: &str, headers: &[(&str, &str)], body: Vec<u8>)
    -> Result<HttpResponse>;
}

/// [`Transport`] backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    max_response_size: usize,
}

impl ReqwestTransport {
    /// Builds the underlying client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the client cannot be
    /// built.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .gzip(true)
            .user_agent(&config.user_agent);

        if let Some(proxy_config) = &config.proxy {
            let mut proxy = reqwest::Proxy::all(&proxy_config.url)
                .map_err(|e| Error::invalid_request(format!("Invalid proxy URL: {e}")))?;

            if let (Some(username), Some(password)) =
                (&proxy_config.username, &proxy_config.password)
            {
                proxy = proxy.basic_auth(username, password);
            }
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_response_size: config.max_response_size,
        })
    }

    async fn read_body(&self, response: reqwest::Response, url: &str) -> Result<Vec<u8>> {
        let max_size = self.max_response_size;

        if let Some(content_length) = response.content_length()
            && content_length > max_size as u64
        {
            warn!(url = %url, content_length, max_size, "Response exceeds size limit");
            return Err(Error::invalid_request(format!(
                "Response size {content_length} bytes exceeds limit {max_size} bytes"
            )));
        }

        #[allow(clippy::cast_possible_truncation)]
        let initial_capacity = response
            .content_length()
            .map_or(8 * 1024, |len| std::cmp::min(len as usize, max_size));

        let mut stream = response.bytes_stream();
        let mut body = Vec::with_capacity(initial_capacity);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                error!(error = %e, "Failed to read response chunk");
                Error::from(NetworkError::from(e))
            })?;

            if body.len().saturating_add(chunk.len()) > max_size {
                warn!(url = %url, max_size, "Response exceeds size limit during streaming");
                return Err(Error::invalid_request(format!(
                    "Response exceeds limit {max_size} bytes (streaming)"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<HttpResponse> {
        let mut request = self.client.post(url);
        for &(name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.body(body).send().await.map_err(|e| {
            error!(error = %e, "HTTP request send failed");
            Error::from(e)
        })?;

        let status = response.status().as_u16();
        let body = self.read_body(response, url).await?;

        Ok(HttpResponse { status, body })
    }
}
