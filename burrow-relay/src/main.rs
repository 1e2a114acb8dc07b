//! burrow-relay binary entry point.
//!
//! Usage:
//! ```bash
//! burrow-relay --config relay.toml
//! burrow-relay --listen 127.0.0.1:8080 --userfile accounts
//! burrow-relay --help
//! ```

use anyhow::{Context, Result};
use burrow_relay::cleanup::spawn_cleanup_task;
use burrow_relay::config::Config;
use burrow_relay::http::{build_router, health};
use burrow_relay::server::TunnelRelay;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Relay server for the burrow HTTP long-poll TCP tunnel.
#[derive(Parser, Debug)]
#[command(name = "burrow-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, default_value = "relay.toml")]
    config: PathBuf,

    /// Address to listen on (overrides server.bind_address)
    #[arg(long)]
    listen: Option<String>,

    /// Account file, one `name:secret` per line (overrides server.accounts_file)
    #[arg(long)]
    userfile: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("burrow_relay=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        tracing::info!(
            "No configuration at {}, using defaults",
            cli.config.display()
        );
        Config::default()
    };
    if let Some(listen) = cli.listen {
        config.server.bind_address = listen;
    }
    if let Some(userfile) = cli.userfile {
        config.server.accounts_file = userfile;
    }

    let bind_address = config.server.bind_address.clone();
    let cleanup = config.cleanup.clone();
    let relay = Arc::new(TunnelRelay::from_config(config).context("Failed to start relay")?);

    health::init_start_time();
    let _cleanup = spawn_cleanup_task(relay.clone(), cleanup);

    let app = build_router(relay);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!(
        "burrow-relay v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        bind_address
    );

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
