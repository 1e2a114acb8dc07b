//! Tunnel endpoints: `auth`, `connect` and `sync`.
//!
//! Every answer is an [`Envelope`] served as `200 text/plain`; failures are
//! reported in the body, never through the status code.

use crate::error::{TunnelError, TunnelResult};
use crate::server::TunnelRelay;
use crate::session::Response as SessionResponse;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use base64::Engine;
use burrow_types::{endpoints, Envelope, BASE64};
use serde::Deserialize;
use std::sync::Arc;

/// An envelope as an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeReply(pub Envelope);

impl IntoResponse for EnvelopeReply {
    fn into_response(self) -> Response {
        (
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.0.encode(),
        )
            .into_response()
    }
}

impl From<TunnelResult<Envelope>> for EnvelopeReply {
    fn from(result: TunnelResult<Envelope>) -> Self {
        match result {
            Ok(envelope) => Self(envelope),
            Err(e) => {
                tracing::debug!("Tunnel request failed: {}", e);
                Self(Envelope::Error(e.user_message()))
            }
        }
    }
}

/// A query string that may have failed to parse.
type QueryResult<T> = Result<Query<T>, QueryRejection>;

/// Unwrap a parsed query, or turn the rejection into an error envelope.
macro_rules! query_or_reply {
    ($query:expr) => {
        match $query {
            Ok(Query(query)) => query,
            Err(rejection) => {
                return EnvelopeReply::from(Err::<Envelope, _>(TunnelError::BadRequest(
                    rejection.body_text(),
                )))
            }
        }
    };
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct AuthQuery {
    username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ConnectQuery {
    remote_host: String,
    remote_port: String,
    username: String,
    proof: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SyncQuery {
    uuid: String,
    data: Option<String>,
}

/// `GET /auth?username=`: issue a challenge.
pub(super) async fn auth_handler(
    Extension(relay): Extension<Arc<TunnelRelay>>,
    query: QueryResult<AuthQuery>,
) -> EnvelopeReply {
    let query = query_or_reply!(query);
    relay
        .issue_challenge(&query.username)
        .map(|challenge| Envelope::Data(challenge.as_bytes().to_vec()))
        .into()
}

/// `GET /connect?remote_host=&remote_port=&username=&proof=`: open a session.
pub(super) async fn connect_handler(
    Extension(relay): Extension<Arc<TunnelRelay>>,
    query: QueryResult<ConnectQuery>,
) -> EnvelopeReply {
    let query = query_or_reply!(query);
    // Unparsable ports fail the range check, after the host check.
    let port = query.remote_port.trim().parse::<i64>().unwrap_or(-1);
    // An undecodable proof is as wrong as an empty one.
    let proof = BASE64.decode(query.proof.trim()).unwrap_or_default();

    match relay
        .open_session(&query.username, &query.remote_host, port, &proof)
        .await
    {
        Ok(id) => EnvelopeReply(Envelope::Ok(id.to_string())),
        Err(TunnelError::UnknownAccount(name)) => {
            tracing::debug!("Connect for unknown account {:?}", name);
            EnvelopeReply(Envelope::Error("Invalid username".to_string()))
        }
        Err(e) => EnvelopeReply::from(Err::<Envelope, _>(e)),
    }
}

/// `GET /sync?uuid=`: wait for the next response of a session.
pub(super) async fn pull_handler(
    Extension(relay): Extension<Arc<TunnelRelay>>,
    query: QueryResult<SyncQuery>,
) -> EnvelopeReply {
    let query = query_or_reply!(query);
    relay
        .pull(&query.uuid)
        .await
        .map(|response| match response {
            Some(SessionResponse::Data(bytes)) => Envelope::Data(bytes),
            Some(SessionResponse::Quit(reason)) => Envelope::Quit(reason),
            // Pull timed out: nothing to deliver yet.
            None => Envelope::Data(Vec::new()),
        })
        .into()
}

/// `POST /sync?uuid=` with form field `data=<base64>`: queue bytes for a session.
pub(super) async fn push_handler(
    Extension(relay): Extension<Arc<TunnelRelay>>,
    query: QueryResult<SyncQuery>,
    body: Bytes,
) -> EnvelopeReply {
    let query = query_or_reply!(query);
    push(&relay, query, &body).await.into()
}

async fn push(relay: &TunnelRelay, query: SyncQuery, body: &[u8]) -> TunnelResult<Envelope> {
    // Unknown ids win over malformed bodies.
    relay.session(&query.uuid)?;

    let encoded = form_data(body)?
        .or(query.data)
        .ok_or(TunnelError::MissingData)?;
    let payload = BASE64
        .decode(encoded.trim())
        .map_err(|e| TunnelError::MalformedEncoding(e.to_string()))?;

    relay.push(&query.uuid, payload).await?;
    Ok(Envelope::Ok(endpoints::PUSH_ACK.to_string()))
}

/// Extract the first `data` field from a urlencoded form body.
fn form_data(body: &[u8]) -> TunnelResult<Option<String>> {
    let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| TunnelError::MalformedEncoding(e.to_string()))?;
    Ok(fields
        .into_iter()
        .find(|(name, _)| name == endpoints::FIELD_DATA)
        .map(|(_, value)| value))
}
