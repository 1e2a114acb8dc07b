//! TunnelClient - the main interface for burrow.
//!
//! This module provides [`TunnelClient`], which authenticates against a relay
//! and opens sessions, and [`Tunnel`], the handle used to push bytes to and
//! pull bytes from one relayed TCP connection.
//!
//! # Architecture
//!
//! ```text
//! Application → TunnelClient → Transport → relay
//!                   ↓
//!                Tunnel (push / pull against one session id)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use burrow_client::{MockTransport, TunnelClient};
//!
//! let transport = MockTransport::new();
//! let client = TunnelClient::new(transport, "alice", b"secret".to_vec());
//! let tunnel = client.connect("localhost", 22).await?;
//! tunnel.push(b"SSH-2.0-burrow\r\n").await?;
//! ```

use base64::Engine;
use burrow_types::{compute_proof, endpoints, Challenge, Envelope, SessionId, WireError, BASE64};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::transport::{Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The relay's response could not be decoded.
    #[error("malformed response: {0}")]
    Wire(#[from] WireError),

    /// The relay answered with an error envelope.
    #[error("relay error: {0}")]
    Relay(String),

    /// The relay answered with an envelope that does not fit the request.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local socket error while forwarding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a pull returned.
#[derive(Clone, PartialEq, Eq)]
pub enum Pulled {
    /// Bytes read from the remote socket.
    Data(Vec<u8>),
    /// The remote connection ended, with the reason.
    Quit(String),
}

impl fmt::Debug for Pulled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(bytes) => write!(f, "Data([{} bytes])", bytes.len()),
            Self::Quit(reason) => f.debug_tuple("Quit").field(reason).finish(),
        }
    }
}

/// Authenticates against a relay and opens tunnels.
pub struct TunnelClient<T: Transport> {
    transport: Arc<T>,
    username: String,
    secret: Vec<u8>,
}

impl<T: Transport> fmt::Debug for TunnelClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelClient")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl<T: Transport> TunnelClient<T> {
    /// Create a new TunnelClient for `username`.
    pub fn new(transport: T, username: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            transport: Arc::new(transport),
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// The account this client authenticates as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Fetch a fresh challenge and return the proof for it.
    ///
    /// The relay keeps only the latest challenge per account, so the proof is
    /// valid until the next `authenticate` for the same account.
    pub async fn authenticate(&self) -> Result<Vec<u8>, ClientError> {
        let body = self
            .transport
            .get(endpoints::AUTH, &[(endpoints::PARAM_USERNAME, self.username.as_str())])
            .await?;

        let challenge = match Envelope::decode(&body)? {
            Envelope::Data(bytes) => Challenge::from_bytes(&bytes)?,
            other => return Err(unexpected("auth", other)),
        };
        tracing::debug!("Received challenge {:?} for {}", challenge, self.username);

        Ok(compute_proof(&self.secret, &challenge).to_vec())
    }

    /// Authenticate and open a tunnel to `host:port`.
    pub async fn connect(&self, host: &str, port: u16) -> Result<Tunnel<T>, ClientError> {
        let proof = BASE64.encode(self.authenticate().await?);
        let port = port.to_string();

        let body = self
            .transport
            .get(
                endpoints::CONNECT,
                &[
                    (endpoints::PARAM_REMOTE_HOST, host),
                    (endpoints::PARAM_REMOTE_PORT, port.as_str()),
                    (endpoints::PARAM_USERNAME, self.username.as_str()),
                    (endpoints::PARAM_PROOF, proof.as_str()),
                ],
            )
            .await?;

        match Envelope::decode(&body)? {
            Envelope::Ok(id) => {
                let id: SessionId = id.parse()?;
                tracing::info!("Opened tunnel {} to {}:{}", id, host, port);
                Ok(Tunnel {
                    transport: Arc::clone(&self.transport),
                    id,
                })
            }
            other => Err(unexpected("connect", other)),
        }
    }
}

/// Handle to one relayed TCP connection.
pub struct Tunnel<T: Transport> {
    transport: Arc<T>,
    id: SessionId,
}

impl<T: Transport> Clone for Tunnel<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            id: self.id,
        }
    }
}

impl<T: Transport> fmt::Debug for Tunnel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tunnel").field("id", &self.id).finish()
    }
}

impl<T: Transport> Tunnel<T> {
    /// The relay's session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue `data` for the remote socket.
    pub async fn push(&self, data: &[u8]) -> Result<(), ClientError> {
        let id = self.id.to_string();
        let encoded = BASE64.encode(data);

        let body = self
            .transport
            .post_form(
                endpoints::SYNC,
                &[(endpoints::PARAM_UUID, id.as_str())],
                &[(endpoints::FIELD_DATA, encoded.as_str())],
            )
            .await?;

        match Envelope::decode(&body)? {
            Envelope::Ok(_) => Ok(()),
            other => Err(unexpected("push", other)),
        }
    }

    /// Wait for the next bytes from the remote socket, or its closure.
    ///
    /// Empty data envelopes (the relay's pull timeout) are retried.
    pub async fn pull(&self) -> Result<Pulled, ClientError> {
        let id = self.id.to_string();

        loop {
            let body = self
                .transport
                .get(endpoints::SYNC, &[(endpoints::PARAM_UUID, id.as_str())])
                .await?;

            match Envelope::decode(&body)? {
                Envelope::Data(bytes) if bytes.is_empty() => continue,
                Envelope::Data(bytes) => return Ok(Pulled::Data(bytes)),
                Envelope::Quit(reason) => return Ok(Pulled::Quit(reason)),
                other => return Err(unexpected("pull", other)),
            }
        }
    }
}

fn unexpected(operation: &str, envelope: Envelope) -> ClientError {
    match envelope {
        Envelope::Error(message) => ClientError::Relay(message),
        other => ClientError::Protocol(format!("unexpected {operation} reply: {}", other.encode())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use burrow_types::verify_proof;

    const CHALLENGE: [u8; 16] = [7u8; 16];
    const ID: &str = "6f1c1e1a-2b7d-4c8e-9a0b-3d5f7e9a1c2b";

    fn client() -> (TunnelClient<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let client = TunnelClient::new(transport.clone(), "alice", b"secret".to_vec());
        (client, transport)
    }

    fn challenge_body() -> String {
        Envelope::Data(CHALLENGE.to_vec()).encode()
    }

    async fn open_tunnel() -> (Tunnel<MockTransport>, MockTransport) {
        let (client, transport) = client();
        transport.queue_response(challenge_body());
        transport.queue_response(format!("OK:{ID}"));
        let tunnel = client.connect("localhost", 22).await.unwrap();
        transport.reset();
        (tunnel, transport)
    }

    #[tokio::test]
    async fn authenticate_proves_the_challenge() {
        let (client, transport) = client();
        transport.queue_response(challenge_body());

        let proof = client.authenticate().await.unwrap();

        let challenge = Challenge::from_bytes(&CHALLENGE).unwrap();
        assert!(verify_proof(b"secret", &challenge, &proof));

        let request = transport.last_request().unwrap();
        assert_eq!(request.path, "/auth");
        assert_eq!(request.query_param("username"), Some("alice"));
    }

    #[tokio::test]
    async fn authenticate_reports_relay_error() {
        let (client, transport) = client();
        transport.queue_response("ERROR:No such user.");

        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(err, ClientError::Relay(ref m) if m == "No such user."));
    }

    #[tokio::test]
    async fn connect_sends_target_and_proof() {
        let (client, transport) = client();
        transport.queue_response(challenge_body());
        transport.queue_response(format!("OK:{ID}"));

        let tunnel = client.connect("db.internal", 5432).await.unwrap();
        assert_eq!(tunnel.id().to_string(), ID);

        let request = transport.last_request().unwrap();
        assert_eq!(request.path, "/connect");
        assert_eq!(request.query_param("remote_host"), Some("db.internal"));
        assert_eq!(request.query_param("remote_port"), Some("5432"));
        assert_eq!(request.query_param("username"), Some("alice"));

        let proof = BASE64.decode(request.query_param("proof").unwrap()).unwrap();
        let challenge = Challenge::from_bytes(&CHALLENGE).unwrap();
        assert!(verify_proof(b"secret", &challenge, &proof));
    }

    #[tokio::test]
    async fn connect_failure_is_relay_error() {
        let (client, transport) = client();
        transport.queue_response(challenge_body());
        transport.queue_response("ERROR:Could not connect to db.internal:5432");

        let err = client.connect("db.internal", 5432).await.unwrap_err();
        assert!(matches!(err, ClientError::Relay(ref m) if m.starts_with("Could not connect")));
    }

    #[tokio::test]
    async fn connect_rejects_bad_session_id() {
        let (client, transport) = client();
        transport.queue_response(challenge_body());
        transport.queue_response("OK:not-a-uuid");

        let err = client.connect("localhost", 22).await.unwrap_err();
        assert!(matches!(err, ClientError::Wire(_)));
    }

    #[tokio::test]
    async fn push_sends_base64_form() {
        let (tunnel, transport) = open_tunnel().await;
        transport.queue_response("OK:Sent.");

        tunnel.push(b"hello").await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/sync");
        assert_eq!(request.query_param("uuid"), Some(ID));
        assert_eq!(request.form_field("data"), Some("aGVsbG8="));
    }

    #[tokio::test]
    async fn pull_skips_empty_data() {
        let (tunnel, transport) = open_tunnel().await;
        transport.queue_response("DATA:");
        transport.queue_response("DATA:");
        transport.queue_response("DATA:aGVsbG8=");
        transport.queue_response("QUIT:EOF");

        assert_eq!(tunnel.pull().await.unwrap(), Pulled::Data(b"hello".to_vec()));
        assert_eq!(tunnel.pull().await.unwrap(), Pulled::Quit("EOF".to_string()));
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test]
    async fn pull_on_unknown_session() {
        let (tunnel, transport) = open_tunnel().await;
        transport.queue_response("ERROR:No such UUID");

        let err = tunnel.pull().await.unwrap_err();
        assert!(matches!(err, ClientError::Relay(ref m) if m == "No such UUID"));
    }

    #[tokio::test]
    async fn transport_failures_propagate() {
        let (tunnel, transport) = open_tunnel().await;
        transport.fail_next("network unreachable");

        let err = tunnel.push(b"x").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn debug_redacts_secret_and_payload() {
        let (client, _) = client();
        let debug = format!("{:?}", client);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("115"));

        assert_eq!(format!("{:?}", Pulled::Data(vec![1, 2, 3])), "Data([3 bytes])");
    }
}
