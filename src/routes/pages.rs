use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Pages Router Module
///
/// The portal's role-gated pages. Whether a role may open one is decided solely by the
/// route table; the list below only names the pages that exist.
///
/// Access Control:
/// `create_router` wraps these routes in the gate middleware, and `render_page` itself takes
/// the `Authorized` extractor. The fallback is covered by the extractor alone, which is what
/// turns an unknown path into a redirect to `/403` for a signed-in user.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(handlers::render_page))
        // --- Courses ---
        .route("/courses", get(handlers::render_page))
        .route("/courses/{course_id}", get(handlers::render_page))
        .route(
            "/courses/{course_id}/onlineregister",
            get(handlers::render_page),
        )
        .route("/mycourses", get(handlers::render_page))
        .route("/checkout/{course_id}", get(handlers::render_page))
        // --- Administration ---
        .route("/coursemanagement", get(handlers::render_page))
        .route("/users", get(handlers::render_page))
        .route("/approve", get(handlers::render_page))
        // --- Profile ---
        .route("/account", get(handlers::render_page))
}
