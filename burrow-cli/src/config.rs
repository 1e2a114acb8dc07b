//! Credential and target handling for burrow.

use anyhow::{bail, Context, Result};
use std::fmt;

/// Everything needed to reach and authenticate against a relay.
#[derive(Clone)]
pub struct Credentials {
    /// Relay base URL.
    pub server: String,
    /// Account name.
    pub username: String,
    /// Account secret.
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Combine command line values, prompting for the secret if it is missing.
    pub fn resolve(server: &str, username: Option<String>, secret: Option<String>) -> Result<Self> {
        let username = username
            .filter(|name| !name.is_empty())
            .context("No account name. Pass --username or set BURROW_USER.")?;
        let secret = resolve_secret(secret)?;
        Ok(Self {
            server: server.to_string(),
            username,
            secret,
        })
    }
}

/// Use `secret` if given, otherwise prompt without echo.
pub fn resolve_secret(secret: Option<String>) -> Result<String> {
    match secret {
        Some(secret) => Ok(secret),
        None => rpassword::prompt_password("Secret: ").context("Failed to read secret"),
    }
}

/// Split `host:port`; IPv6 hosts may be bracketed (`[::1]:22`).
pub fn parse_remote(remote: &str) -> Result<(String, u16)> {
    let (host, port) = remote
        .rsplit_once(':')
        .with_context(|| format!("Remote {remote:?} must be host:port"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        bail!("Remote {remote:?} has an empty host");
    }
    let port = port
        .parse::<u16>()
        .with_context(|| format!("Remote {remote:?} has an invalid port"))?;
    Ok((host.to_string(), port))
}
