//! Identity types for burrow sessions and the auth handshake.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{WireError, BASE64};

/// Length of an authentication challenge in bytes.
pub const CHALLENGE_LEN: usize = 16;

/// Identifier of a tunnel session.
///
/// UUID v4, rendered in its hyphenated form on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Create a new random SessionId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for SessionId {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::parse_str(s.trim())?))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

/// A random challenge issued to an account before it may open a session.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Challenge([u8; CHALLENGE_LEN]);

impl Challenge {
    /// Draw a fresh challenge from the OS random source.
    pub fn generate() -> Result<Self, WireError> {
        let mut bytes = [0u8; CHALLENGE_LEN];
        getrandom::getrandom(&mut bytes).map_err(|e| WireError::Random(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Create a Challenge from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let arr: [u8; CHALLENGE_LEN] =
            bytes
                .try_into()
                .map_err(|_| WireError::InvalidChallengeLength {
                    expected: CHALLENGE_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Decode a Challenge from its base64 wire form.
    pub fn from_base64(encoded: &str) -> Result<Self, WireError> {
        Self::from_bytes(&BASE64.decode(encoded.trim())?)
    }

    /// Get the raw bytes of this Challenge.
    pub fn as_bytes(&self) -> &[u8; CHALLENGE_LEN] {
        &self.0
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix, the full value is a credential for as long as it is current.
        write!(f, "Challenge({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_uuid_v4() {
        let id = SessionId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn session_id_parses_display_form() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn session_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<SessionId>().is_err());
        assert!("".parse::<SessionId>().is_err());
    }

    #[test]
    fn challenges_are_random() {
        let a = Challenge::generate().unwrap();
        let b = Challenge::generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn challenge_requires_exact_length() {
        assert!(Challenge::from_bytes(&[0u8; 15]).is_err());
        assert!(Challenge::from_bytes(&[0u8; 17]).is_err());
        assert!(Challenge::from_bytes(&[7u8; 16]).is_ok());
    }

    #[test]
    fn challenge_from_base64() {
        let challenge = Challenge::from_base64("AAECAwQFBgcICQoLDA0ODw==").unwrap();
        assert_eq!(challenge.as_bytes()[15], 15);
    }

    #[test]
    fn challenge_debug_is_truncated() {
        let challenge = Challenge::from_bytes(&[0xab; 16]).unwrap();
        assert_eq!(format!("{:?}", challenge), "Challenge(abab..)");
    }
}
