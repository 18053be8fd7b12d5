use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session. These are also the redirect targets of the gate
/// (`/` and `/403`), so they must never be gated themselves or a denied navigation would loop.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Landing page; where missing, malformed and expired sessions are sent.
        .route("/", get(handlers::public_page))
        // GET /403
        // Static forbidden page; where a role is sent when it may not enter a path.
        .route("/403", get(handlers::public_page))
        // Account bootstrap pages.
        .route("/sign-up", get(handlers::public_page))
        .route("/forgot-password", get(handlers::public_page))
        // Payment provider return pages. The checkout itself is gated.
        .route("/success", get(handlers::public_page))
        .route("/return", get(handlers::public_page))
}
