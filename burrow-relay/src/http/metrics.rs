//! Prometheus metrics endpoint.

use crate::server::TunnelRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<TunnelRelay>>) -> impl IntoResponse {
    let body = render(&relay);
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

fn render(relay: &TunnelRelay) -> String {
    let m = relay.metrics();

    // Gauges: current state
    let sessions = relay.total_sessions();
    let open_sessions = relay.open_sessions();
    let challenges = relay.auth().outstanding_challenges();

    // Counters: monotonic since startup
    let challenges_issued = m.challenges_issued.load(Ordering::Relaxed);
    let sessions_opened = m.sessions_opened.load(Ordering::Relaxed);
    let auth_failures = m.auth_failures.load(Ordering::Relaxed);
    let dial_failures = m.dial_failures.load(Ordering::Relaxed);
    let pushes = m.pushes_total.load(Ordering::Relaxed);
    let pulls = m.pulls_total.load(Ordering::Relaxed);
    let bytes_out = m.bytes_to_remote.load(Ordering::Relaxed);
    let bytes_in = m.bytes_from_remote.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);

    format!(
        r#"# HELP burrow_relay_sessions Registered sessions (open and closed)
# TYPE burrow_relay_sessions gauge
burrow_relay_sessions {sessions}

# HELP burrow_relay_sessions_open Sessions with a live remote socket
# TYPE burrow_relay_sessions_open gauge
burrow_relay_sessions_open {open_sessions}

# HELP burrow_relay_challenges_outstanding Challenges on record
# TYPE burrow_relay_challenges_outstanding gauge
burrow_relay_challenges_outstanding {challenges}

# HELP burrow_relay_info Server information
# TYPE burrow_relay_info gauge
burrow_relay_info{{version="{version}"}} 1

# HELP burrow_relay_challenges_issued_total Total challenges issued
# TYPE burrow_relay_challenges_issued_total counter
burrow_relay_challenges_issued_total {challenges_issued}

# HELP burrow_relay_sessions_opened_total Total sessions opened
# TYPE burrow_relay_sessions_opened_total counter
burrow_relay_sessions_opened_total {sessions_opened}

# HELP burrow_relay_auth_failures_total Total handshakes rejected for a bad proof
# TYPE burrow_relay_auth_failures_total counter
burrow_relay_auth_failures_total {auth_failures}

# HELP burrow_relay_dial_failures_total Total failed dials to remote endpoints
# TYPE burrow_relay_dial_failures_total counter
burrow_relay_dial_failures_total {dial_failures}

# HELP burrow_relay_pushes_total Total push requests handled
# TYPE burrow_relay_pushes_total counter
burrow_relay_pushes_total {pushes}

# HELP burrow_relay_pulls_total Total pull requests answered
# TYPE burrow_relay_pulls_total counter
burrow_relay_pulls_total {pulls}

# HELP burrow_relay_bytes_to_remote_total Total bytes queued for remote sockets
# TYPE burrow_relay_bytes_to_remote_total counter
burrow_relay_bytes_to_remote_total {bytes_out}

# HELP burrow_relay_bytes_from_remote_total Total bytes delivered to pull callers
# TYPE burrow_relay_bytes_from_remote_total counter
burrow_relay_bytes_from_remote_total {bytes_in}

# HELP burrow_relay_rate_limit_hits_total Total rate limit rejections
# TYPE burrow_relay_rate_limit_hits_total counter
burrow_relay_rate_limit_hits_total {rate_limits}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
