//! # burrow
//!
//! Command line client for the burrow HTTP long-poll TCP tunnel.
//!
//! ## Commands
//!
//! - `forward`: Forward a local port to a remote endpoint through the relay
//! - `pipe`: Connect stdin/stdout to a remote endpoint through the relay
//! - `proof`: Print the proof for a challenge (manual testing)
//!
//! ## Example
//!
//! ```bash
//! # Reach an SSH server behind an HTTP-only egress
//! burrow --server http://relay:8080 --username alice \
//!     forward --listen 127.0.0.1:2222 --remote internal-host:22
//!
//! # Use as an SSH ProxyCommand
//! ssh -o ProxyCommand='burrow --username alice pipe --remote %h:%p' internal-host
//!
//! # Compute a proof by hand
//! burrow proof --challenge q83vEjRWeJCrze8SNFZ4kA==
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{forward, pipe, proof};
use config::Credentials;

/// Command line client for the burrow HTTP tunnel.
#[derive(Parser, Debug)]
#[command(name = "burrow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Relay base URL
    #[arg(long, global = true, env = "BURROW_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Account name
    #[arg(long, short, global = true, env = "BURROW_USER")]
    username: Option<String>,

    /// Account secret (will prompt if not provided)
    #[arg(long, global = true, env = "BURROW_SECRET", hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Forward a local port to a remote endpoint
    Forward {
        /// Local address to listen on
        #[arg(long, short, default_value = "127.0.0.1:0")]
        listen: String,

        /// Remote endpoint as host:port
        #[arg(long, short)]
        remote: String,
    },

    /// Connect stdin/stdout to a remote endpoint
    Pipe {
        /// Remote endpoint as host:port
        #[arg(long, short)]
        remote: String,
    },

    /// Print the base64 proof for a base64 challenge
    Proof {
        /// Challenge as returned in the auth reply
        #[arg(long, short)]
        challenge: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `pipe` keeps stdout clean.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("burrow=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Forward { listen, remote } => {
            let credentials = Credentials::resolve(&cli.server, cli.username, cli.secret)?;
            forward::run(&credentials, &listen, &remote).await?;
        }
        Commands::Pipe { remote } => {
            let credentials = Credentials::resolve(&cli.server, cli.username, cli.secret)?;
            pipe::run(&credentials, &remote).await?;
        }
        Commands::Proof { challenge } => {
            let secret = config::resolve_secret(cli.secret)?;
            proof::run(&secret, &challenge)?;
        }
    }

    Ok(())
}
