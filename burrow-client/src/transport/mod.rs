//! Transport abstraction for burrow.
//!
//! This module provides a pluggable transport layer that abstracts how
//! tunnel requests reach the relay (reqwest over HTTP, mock for testing).
//!
//! # Design
//!
//! Every tunnel operation is one request/response exchange:
//! - `get()` issues a query-only request (`auth`, `connect`, pull)
//! - `post_form()` issues a request with a urlencoded body (push)
//!
//! Both return the raw response body; decoding the envelope is up to the
//! caller.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_response("DATA:q83vEjRWeJCrze8SNFZ4kA==");
//! let body = transport.get("/auth", &[("username", "alice")]).await?;
//! ```

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::{MockTransport, RecordedRequest};

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the relay.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The relay answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The response body could not be read.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Invalid relay URL.
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,
}

/// Transport trait for issuing tunnel requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET path?query`, returning the response body.
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, TransportError>;

    /// `POST path?query` with `form` as a urlencoded body, returning the response body.
    async fn post_form(
        &self,
        path: &str,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<String, TransportError>;
}
