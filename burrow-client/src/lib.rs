//! # burrow-client
//!
//! Client library for the burrow HTTP long-poll TCP tunnel.
//!
//! ## Features
//!
//! - **Handshake**: challenge-response authentication against a relay
//! - **Tunnels**: push and pull bytes of a relayed TCP connection
//! - **Port forwarding**: pump local TCP connections through tunnels
//! - **Transport Abstraction**: Pluggable transport layer (HTTP, mock)
//!
//! ## Example
//!
//! ```ignore
//! use burrow_client::{HttpTransport, TunnelClient, Pulled};
//!
//! let transport = HttpTransport::new("http://relay.example:8080")?;
//! let client = TunnelClient::new(transport, "alice", b"secret".to_vec());
//!
//! let tunnel = client.connect("db.internal", 5432).await?;
//! tunnel.push(b"hello").await?;
//! match tunnel.pull().await? {
//!     Pulled::Data(bytes) => println!("{} bytes", bytes.len()),
//!     Pulled::Quit(reason) => println!("closed: {reason}"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod forward;
pub mod transport;

pub use client::{ClientError, Pulled, Tunnel, TunnelClient};
pub use forward::{forward_connection, forward_stream, serve_forward};
pub use transport::{HttpTransport, MockTransport, Transport, TransportError};
