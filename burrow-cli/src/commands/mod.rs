//! CLI command implementations.

pub mod forward;
pub mod pipe;
pub mod proof;

use anyhow::{Context, Result};
use burrow_client::{HttpTransport, TunnelClient};

use crate::config::Credentials;

/// Build a client for the relay named in `credentials`.
fn client(credentials: &Credentials) -> Result<TunnelClient<HttpTransport>> {
    let transport = HttpTransport::new(&credentials.server)
        .with_context(|| format!("Invalid relay URL {:?}", credentials.server))?;
    Ok(TunnelClient::new(
        transport,
        credentials.username.clone(),
        credentials.secret.as_bytes().to_vec(),
    ))
}
