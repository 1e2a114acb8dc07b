//! Error types for burrow wire handling.

use thiserror::Error;

/// Errors that can occur while parsing wire values.
#[derive(Debug, Error)]
pub enum WireError {
    /// Body does not start with a known envelope tag
    #[error("unknown envelope tag in body: {0:?}")]
    UnknownTag(String),

    /// Base64 payload could not be decoded
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Session identifier is not a UUID
    #[error("invalid session id: {0}")]
    InvalidSessionId(#[from] uuid::Error),

    /// Challenge has the wrong length
    #[error("invalid challenge length: expected {expected}, got {actual}")]
    InvalidChallengeLength {
        /// Required length in bytes.
        expected: usize,
        /// Length that was received.
        actual: usize,
    },

    /// The OS random source failed
    #[error("random source unavailable: {0}")]
    Random(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = WireError::InvalidChallengeLength {
            expected: 16,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "invalid challenge length: expected 16, got 3"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WireError>();
    }
}
