//! Challenge-response proof derivation.
//!
//! `proof = HMAC-SHA256(key = secret, message = challenge)`. The secret never
//! leaves the client; the relay recomputes the MAC and compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::Challenge;

type HmacSha256 = Hmac<Sha256>;

/// Length of a proof in bytes.
pub const PROOF_LEN: usize = 32;

/// Derive the proof for `challenge` under `secret`.
pub fn compute_proof(secret: &[u8], challenge: &Challenge) -> [u8; PROOF_LEN] {
    let mut mac = mac_for(secret);
    mac.update(challenge.as_bytes());
    let mut proof = [0u8; PROOF_LEN];
    proof.copy_from_slice(&mac.finalize().into_bytes());
    proof
}

/// Check `proof` against `challenge` under `secret`.
pub fn verify_proof(secret: &[u8], challenge: &Challenge, proof: &[u8]) -> bool {
    let mut mac = mac_for(secret);
    mac.update(challenge.as_bytes());
    mac.verify_slice(proof).is_ok()
}

fn mac_for(secret: &[u8]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC accepts keys of any length")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(byte: u8) -> Challenge {
        Challenge::from_bytes(&[byte; 16]).unwrap()
    }

    #[test]
    fn proof_verifies_under_same_secret() {
        let c = challenge(1);
        let proof = compute_proof(b"s", &c);
        assert!(verify_proof(b"s", &c, &proof));
    }

    #[test]
    fn proof_rejected_under_other_secret() {
        let c = challenge(1);
        let proof = compute_proof(b"s", &c);
        assert!(!verify_proof(b"t", &c, &proof));
    }

    #[test]
    fn proof_bound_to_challenge() {
        let proof = compute_proof(b"s", &challenge(1));
        assert!(!verify_proof(b"s", &challenge(2), &proof));
    }

    #[test]
    fn truncated_proof_rejected() {
        let c = challenge(3);
        let proof = compute_proof(b"s", &c);
        assert!(!verify_proof(b"s", &c, &proof[..16]));
        assert!(!verify_proof(b"s", &c, &[]));
    }

    #[test]
    fn proof_is_deterministic() {
        let c = challenge(9);
        assert_eq!(compute_proof(b"secret", &c), compute_proof(b"secret", &c));
        assert_eq!(compute_proof(b"secret", &c).len(), PROOF_LEN);
    }
}
