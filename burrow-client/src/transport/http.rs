//! HTTP transport backed by reqwest.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::time::Duration;

/// Transport that talks to a relay over HTTP(S).
///
/// No overall request timeout is set: pulls block on the relay until the
/// remote sends something.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the relay at `base_url` (e.g. `http://relay:8080`).
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_connect_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a transport with an explicit TCP connect timeout.
    pub fn with_connect_timeout(
        base_url: &str,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            base_url: base_url.to_string(),
            client,
        })
    }

    /// The relay base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn body(request: reqwest::RequestBuilder) -> Result<String, TransportError> {
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::ConnectionFailed(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, TransportError> {
        Self::body(self.client.get(self.url(path)).query(query)).await
    }

    async fn post_form(
        &self,
        path: &str,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<String, TransportError> {
        Self::body(self.client.post(self.url(path)).query(query).form(form)).await
    }
}
