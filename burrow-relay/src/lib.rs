//! # burrow-relay
//!
//! Relay server for the burrow HTTP long-poll TCP tunnel.
//!
//! This crate implements a relay server that:
//! - Authenticates clients with a challenge-response handshake
//! - Dials arbitrary TCP endpoints on their behalf
//! - Relays bytes in both directions over plain HTTP requests
//! - Keeps each session independent of every other
//!
//! ## Architecture
//!
//! ```text
//! Client ──── HTTP (auth / connect / sync) ────┐
//!                                              │
//!        ┌─────────────────────────────────────┴───┐
//!        │              burrow-relay               │
//!        │  session ─ commands ─► relay worker ────┼──► TCP remote
//!        │          ◄ responses ─              ◄───┤
//!        └─────────────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! Every endpoint answers `200 text/plain` with one envelope:
//! - `GET /auth` → `DATA:<challenge>`
//! - `GET /connect` → `OK:<session id>`
//! - `POST /sync` → `OK:Sent.`
//! - `GET /sync` → `DATA:<bytes>` or `QUIT:<reason>`
//!
//! Failures answer `ERROR:<message>`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accounts;
pub mod auth;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod http;
pub mod limits;
pub mod server;
pub mod session;
