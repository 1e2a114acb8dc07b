//! HTTP endpoints for burrow-relay.
//!
//! Provides the tunnel endpoints plus health checks and metrics.

pub mod health;
mod metrics;
mod tunnel;

use crate::server::TunnelRelay;
use axum::{routing::get, Extension, Router};
use burrow_types::endpoints;
use std::sync::Arc;

pub use health::HealthStatus;
pub use tunnel::EnvelopeReply;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<TunnelRelay>) -> Router {
    let mut router = Router::new()
        .route(endpoints::AUTH, get(tunnel::auth_handler))
        .route(endpoints::CONNECT, get(tunnel::connect_handler))
        .route(
            endpoints::SYNC,
            get(tunnel::pull_handler).post(tunnel::push_handler),
        )
        .route("/health", get(health::health_handler));

    if relay.config().http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router.layer(Extension(relay))
}
