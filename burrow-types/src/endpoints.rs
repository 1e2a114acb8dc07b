//! HTTP paths and parameter names of the tunnel protocol.

/// Issue a challenge: `GET /auth?username=`.
pub const AUTH: &str = "/auth";

/// Open a session: `GET /connect?remote_host=&remote_port=&username=&proof=`.
pub const CONNECT: &str = "/connect";

/// Pull (`GET`) or push (`POST`, form field `data`) against a session: `/sync?uuid=`.
pub const SYNC: &str = "/sync";

/// Query parameter carrying the account name.
pub const PARAM_USERNAME: &str = "username";
/// Query parameter carrying the remote host.
pub const PARAM_REMOTE_HOST: &str = "remote_host";
/// Query parameter carrying the remote port.
pub const PARAM_REMOTE_PORT: &str = "remote_port";
/// Query parameter carrying the base64 proof.
pub const PARAM_PROOF: &str = "proof";
/// Query parameter carrying the session id.
pub const PARAM_UUID: &str = "uuid";
/// Form field carrying base64 push data.
pub const FIELD_DATA: &str = "data";

/// Acknowledgement text returned by a successful push.
pub const PUSH_ACK: &str = "Sent.";
