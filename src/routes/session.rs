use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Session Router Module
///
/// Manages the lifecycle of the `token` cookie. None of these routes are gated: login has
/// no token yet, and logout and `GET /session` must answer even for a stale one.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        // GET /session
        // Decoded role, subject, expiry and menu of the current session.
        .route("/session", get(handlers::get_session))
        // POST /session/login
        // Exchanges credentials for a token at the auth API and sets the cookie.
        .route("/session/login", post(handlers::login))
        // POST /session/logout
        // Clears the cookie and notifies the auth API in the background.
        .route("/session/logout", post(handlers::logout))
}
