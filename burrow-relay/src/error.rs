//! Error types for burrow-relay.

/// Startup and serving errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Account file error.
    #[error("account file error: {0}")]
    Accounts(#[from] crate::accounts::AccountsError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a remote target was rejected before dialing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// Host is empty.
    #[error("empty remote host")]
    EmptyHost,
    /// Port is missing, not a number, or outside 0..=65535.
    #[error("remote port out of range")]
    BadPort,
}

/// Failures of a single tunnel request.
///
/// All of these are reported to the calling request as an error envelope;
/// none of them affect other sessions.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    /// No account with that name.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// No (live) challenge on record for the account.
    #[error("no challenge issued for account: {0}")]
    NoChallengeIssued(String),

    /// Proof missing, malformed or not matching the current challenge.
    #[error("authentication failed for account: {0}")]
    AuthenticationFailed(String),

    /// Remote host or port rejected.
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] TargetError),

    /// Remote endpoint could not be reached.
    #[error("could not connect to {host}:{port}: {source}")]
    DialFailed {
        /// Requested host.
        host: String,
        /// Requested port.
        port: u16,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Session id is not registered.
    #[error("no such session: {0}")]
    NoSuchSession(String),

    /// The session's relay worker has stopped.
    #[error("session closed")]
    SessionClosed,

    /// Push body could not be decoded.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Query string could not be parsed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Push body has no data field.
    #[error("push without data")]
    MissingData,

    /// Request refused by a rate limiter.
    #[error("rate limit exceeded: {reason}")]
    RateLimited {
        /// Which limit was hit.
        reason: String,
    },

    /// Server-side failure unrelated to the request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TunnelError {
    /// The reason text sent to the client in an error envelope.
    pub fn user_message(&self) -> String {
        match self {
            // The connect handler answers "Invalid username" instead.
            TunnelError::UnknownAccount(_) => "No such user.".to_string(),
            TunnelError::NoChallengeIssued(_) | TunnelError::AuthenticationFailed(_) => {
                "Invalid nonce".to_string()
            }
            TunnelError::InvalidTarget(TargetError::EmptyHost) => "Invalid host".to_string(),
            TunnelError::InvalidTarget(TargetError::BadPort) => {
                "Invalid port number.".to_string()
            }
            TunnelError::DialFailed { host, port, .. } => {
                format!("Could not connect to {host}:{port}")
            }
            TunnelError::NoSuchSession(_) => "No such UUID".to_string(),
            TunnelError::SessionClosed => "Session closed.".to_string(),
            TunnelError::MalformedEncoding(_) => "Could not decode B64.".to_string(),
            TunnelError::BadRequest(_) => "Invalid request.".to_string(),
            TunnelError::MissingData => "Data is required.".to_string(),
            TunnelError::RateLimited { .. } => "Rate limit exceeded.".to_string(),
            TunnelError::Internal(_) => "Internal error.".to_string(),
        }
    }
}

/// Result type alias for relay startup.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for tunnel operations.
pub type TunnelResult<T> = std::result::Result<T, TunnelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_match_wire_texts() {
        assert_eq!(
            TunnelError::InvalidTarget(TargetError::EmptyHost).user_message(),
            "Invalid host"
        );
        assert_eq!(
            TunnelError::InvalidTarget(TargetError::BadPort).user_message(),
            "Invalid port number."
        );
        assert_eq!(
            TunnelError::AuthenticationFailed("alice".into()).user_message(),
            "Invalid nonce"
        );
        assert_eq!(
            TunnelError::NoSuchSession("x".into()).user_message(),
            "No such UUID"
        );
        assert_eq!(
            TunnelError::MalformedEncoding("bad".into()).user_message(),
            "Could not decode B64."
        );
        assert_eq!(TunnelError::MissingData.user_message(), "Data is required.");
        assert_eq!(
            TunnelError::BadRequest("duplicate field".into()).user_message(),
            "Invalid request."
        );
    }

    #[test]
    fn dial_failure_names_target() {
        let err = TunnelError::DialFailed {
            host: "example.org".into(),
            port: 80,
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(err.user_message(), "Could not connect to example.org:80");
    }

    #[test]
    fn internal_details_stay_server_side() {
        let err = TunnelError::Internal("getrandom: EAGAIN".into());
        assert_eq!(err.user_message(), "Internal error.");
        assert!(err.to_string().contains("EAGAIN"));
    }
}
