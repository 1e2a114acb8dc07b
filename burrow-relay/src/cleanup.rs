//! Background cleanup task.
//!
//! Runs periodically to forget closed sessions, drop expired challenges, and
//! shrink the rate limiter tables.

use crate::config::CleanupConfig;
use crate::server::TunnelRelay;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn a background cleanup task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_task(
    relay: Arc<TunnelRelay>,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Cleanup task disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        let closed_ttl = Duration::from_secs(config.closed_session_ttl_secs);
        tracing::info!("Cleanup task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;
            run_once(&relay, closed_ttl);
        }
    })
}

/// One cleanup pass.
pub fn run_once(relay: &TunnelRelay, closed_ttl: Duration) {
    let sessions = relay.reap_closed_sessions(closed_ttl);
    let challenges = relay.auth().prune_expired();
    relay.rate_limits().shrink();

    if sessions > 0 || challenges > 0 {
        tracing::info!(
            "Cleanup: removed {} closed sessions, {} expired challenges",
            sessions,
            challenges
        );
    } else {
        tracing::debug!("Cleanup: nothing to remove");
    }
}
