//! Configuration loading for burrow-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`). Every
//! section and field is optional.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for burrow-relay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Per-session queue and socket configuration.
    pub session: SessionConfig,
    /// Challenge handling configuration.
    pub auth: AuthConfig,
    /// Rate limiting configuration.
    pub limits: LimitsConfig,
    /// HTTP endpoints configuration.
    pub http: HttpConfig,
    /// Cleanup task configuration.
    pub cleanup: CleanupConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP server (default: 0.0.0.0:8080).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Path of the account file, one `name:secret` per line.
    #[serde(default = "default_accounts_file")]
    pub accounts_file: PathBuf,
}

/// Per-session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Capacity of each of the two session queues (default: 10).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Largest single read from the remote socket, in bytes (default: 16KB).
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Dial timeout in seconds; 0 leaves it to the OS (default: 0).
    #[serde(default)]
    pub dial_timeout_secs: u64,
    /// Longest a pull waits before answering with an empty data envelope;
    /// 0 waits until data or closure (default: 0).
    #[serde(default)]
    pub pull_timeout_secs: u64,
}

/// Challenge handling configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Age after which an unused challenge no longer verifies; 0 = never (default: 0).
    #[serde(default)]
    pub challenge_ttl_secs: u64,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum auth + connect requests per account per minute (default: 60).
    #[serde(default = "default_auth_per_minute")]
    pub auth_per_minute: u32,
    /// Maximum tunnel requests per second across all clients (default: 1000).
    #[serde(default = "default_global_requests_per_second")]
    pub global_requests_per_second: u32,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

/// Cleanup task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Cleanup interval in seconds (default: 60).
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
    /// Enable cleanup task (default: true).
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
    /// How long a closed session stays pullable before it is forgotten (default: 300).
    #[serde(default = "default_closed_session_ttl")]
    pub closed_session_ttl_secs: u64,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_accounts_file() -> PathBuf {
    PathBuf::from("/etc/burrow/accounts")
}

fn default_queue_capacity() -> usize {
    10
}

fn default_read_buffer_size() -> usize {
    16 * 1024
}

fn default_auth_per_minute() -> u32 {
    60
}

fn default_global_requests_per_second() -> u32 {
    1000
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_closed_session_ttl() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            accounts_file: default_accounts_file(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            read_buffer_size: default_read_buffer_size(),
            dial_timeout_secs: 0,
            pull_timeout_secs: 0,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            auth_per_minute: default_auth_per_minute(),
            global_requests_per_second: default_global_requests_per_second(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
            enabled: default_cleanup_enabled(),
            closed_session_ttl_secs: default_closed_session_ttl(),
        }
    }
}

impl SessionConfig {
    /// Dial timeout, if one is configured.
    pub fn dial_timeout(&self) -> Option<Duration> {
        (self.dial_timeout_secs > 0).then(|| Duration::from_secs(self.dial_timeout_secs))
    }

    /// Pull timeout, if one is configured.
    pub fn pull_timeout(&self) -> Option<Duration> {
        (self.pull_timeout_secs > 0).then(|| Duration::from_secs(self.pull_timeout_secs))
    }
}

impl AuthConfig {
    /// Challenge lifetime, if challenges expire.
    pub fn challenge_ttl(&self) -> Option<Duration> {
        (self.challenge_ttl_secs > 0).then(|| Duration::from_secs(self.challenge_ttl_secs))
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {}: {source}", path.display())]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {}: {source}", path.display())]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
