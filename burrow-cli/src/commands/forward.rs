//! Forward a local port through the relay.

use anyhow::{Context, Result};
use burrow_client::serve_forward;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{parse_remote, Credentials};

/// Run the forward command.
pub async fn run(credentials: &Credentials, listen: &str, remote: &str) -> Result<()> {
    let (host, port) = parse_remote(remote)?;
    let client = Arc::new(super::client(credentials)?);

    // Fail early on bad credentials instead of on the first connection.
    client
        .authenticate()
        .await
        .context("Authentication failed")?;

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to listen on {listen}"))?;
    let local = listener.local_addr()?;
    println!(
        "Forwarding {} -> {}:{} via {}",
        local, host, port, credentials.server
    );

    serve_forward(client, listener, host, port)
        .await
        .context("Forwarding stopped")?;
    Ok(())
}
