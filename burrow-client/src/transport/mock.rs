//! Mock transport for testing.
//!
//! Allows queueing response bodies and capturing sent requests for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A request captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// `GET` or `POST`.
    pub method: &'static str,
    /// Request path.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// Form fields in order (empty for `GET`).
    pub form: Vec<(String, String)>,
}

impl RecordedRequest {
    /// Value of the first query parameter called `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        find(&self.query, name)
    }

    /// Value of the first form field called `name`.
    pub fn form_field(&self, name: &str) -> Option<&str> {
        find(&self.form, name)
    }
}

fn find<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Mock transport for testing.
///
/// Allows queueing response bodies and capturing sent requests for verification.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    requests: Vec<RecordedRequest>,
    response_queue: VecDeque<String>,
    fail_next: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a body to be returned by the next request.
    pub fn queue_response(&self, body: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.response_queue.push_back(body.into());
    }

    /// Get all requests that were sent.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        let inner = self.inner.lock().unwrap();
        inner.requests.clone()
    }

    /// Get the last request that was sent.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        let inner = self.inner.lock().unwrap();
        inner.requests.last().cloned()
    }

    /// Cause the next request to fail with the given error.
    pub fn fail_next(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next = Some(error.to_string());
    }

    /// Clear all state (requests, queue, pending failure).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }

    fn exchange(&self, request: RecordedRequest) -> Result<String, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request);

        // Check for forced failure
        if let Some(error) = inner.fail_next.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner
            .response_queue
            .pop_front()
            .ok_or_else(|| TransportError::ReceiveFailed("no queued response".to_string()))
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, TransportError> {
        self.exchange(RecordedRequest {
            method: "GET",
            path: path.to_string(),
            query: owned(query),
            form: Vec::new(),
        })
    }

    async fn post_form(
        &self,
        path: &str,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<String, TransportError> {
        self.exchange(RecordedRequest {
            method: "POST",
            path: path.to_string(),
            query: owned(query),
            form: owned(form),
        })
    }
}
