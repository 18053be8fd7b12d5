use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access control core.
pub mod auth;
pub mod gate;
pub mod roles;
pub mod session;

// Collaborators and HTTP plumbing.
pub mod auth_api;
pub mod config;
pub mod handlers;
pub mod models;
pub mod navigation;

// Module for routing segregation (Public, Session, Gated Pages).
pub mod routes;
use gate::Authorized;
use routes::{pages, public};

// --- Public Re-exports ---

pub use auth_api::{AuthApiState, HttpAuthApi, MockAuthApi};
pub use config::AppConfig;
pub use gate::{AccessGate, Decision, GateError, GateState};
pub use roles::{Role, RouteTable};
pub use session::{SessionContext, SessionToken, TokenStore};

/// ApiDoc
///
/// OpenAPI document for the session endpoints, served at `/api-docs/openapi.json`.
/// Gated pages are not listed; their shape is always `PageContext`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::login, handlers::logout, handlers::get_session),
    components(schemas(
        models::LoginRequest,
        models::SessionInfo,
        models::PageContext,
        models::NavItem,
        roles::Role,
    )),
    tags((name = "course-portal", description = "Course portal access gateway"))
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: configuration, the access
/// gate built from it, and the client for the remote auth API.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub gate: GateState,
    pub auth_api: AuthApiState,
}

impl AppState {
    /// Builds the gate from `config` and bundles it with the auth API client.
    pub fn new(config: AppConfig, auth_api: AuthApiState) -> Self {
        let gate = std::sync::Arc::new(AccessGate::from_config(&config));
        Self {
            config,
            gate,
            auth_api,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for GateState {
    fn from_ref(app_state: &AppState) -> GateState {
        app_state.gate.clone()
    }
}

impl FromRef<AppState> for AuthApiState {
    fn from_ref(app_state: &AppState) -> AuthApiState {
        app_state.auth_api.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// gate_middleware
///
/// Runs the access gate before any page handler. `Authorized` rejects a refused navigation
/// with its redirect; an allowed one leaves the resolved principal in the request extensions
/// for the handler to pick up.
async fn gate_middleware(_granted: Authorized, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the gateway: public pages, session endpoints, gated pages and the gated
/// fallback, wrapped in the request-id and tracing layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(routes::session::session_routes())
        .merge(pages::page_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate_middleware,
        )))
        // Unregistered paths are still navigations: gate them like any page.
        .fallback(handlers::render_page)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` so every gate decision logged
/// during the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
