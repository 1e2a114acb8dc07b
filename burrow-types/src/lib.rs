//! # burrow-types
//!
//! Wire format types shared by the burrow relay and its clients.
//!
//! This crate provides:
//! - [`SessionId`], [`Challenge`] - Identity types for tunnel sessions and the auth handshake
//! - [`Envelope`] - The text body every tunnel endpoint answers with
//! - [`endpoints`] - HTTP paths and query parameter names
//! - [`compute_proof`] / [`verify_proof`] - Challenge-response proof derivation
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod endpoints;
mod envelope;
mod error;
mod ids;
mod proof;

pub use envelope::Envelope;
pub use error::WireError;
pub use ids::{Challenge, SessionId, CHALLENGE_LEN};
pub use proof::{compute_proof, verify_proof, PROOF_LEN};

/// Base64 engine used for every binary value carried on the wire.
///
/// Standard alphabet with padding, matching what form and query encoders
/// on the client side produce.
pub const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;
