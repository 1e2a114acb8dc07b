//! Connect stdin/stdout to a remote endpoint.

use anyhow::{Context, Result};
use burrow_client::forward_stream;

use crate::config::{parse_remote, Credentials};

/// Run the pipe command.
pub async fn run(credentials: &Credentials, remote: &str) -> Result<()> {
    let (host, port) = parse_remote(remote)?;
    let client = super::client(credentials)?;

    let tunnel = client
        .connect(&host, port)
        .await
        .with_context(|| format!("Could not open tunnel to {host}:{port}"))?;
    tracing::debug!("Piping stdin/stdout through tunnel {}", tunnel.id());

    forward_stream(tunnel, tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("Tunnel failed")?;
    Ok(())
}
