use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    auth::Claims,
    auth_api::AuthApiError,
    gate::{Authorized, GateError, GateState, LOGIN_ROUTE},
    models::{LoginRequest, NavItem, PageContext, SessionInfo},
    navigation::navigation_for,
    roles::{Role, RouteTable},
    session::{SessionContext, TokenStore},
};

fn navigation_for_claim(table: &RouteTable, role: &str, current_path: &str) -> Vec<NavItem> {
    role.parse::<Role>()
        .map(|role| navigation_for(table, role, current_path))
        .unwrap_or_default()
}

fn session_info(table: &RouteTable, claims: Claims) -> SessionInfo {
    let expires_at = claims.expires_at();
    SessionInfo {
        navigation: navigation_for_claim(table, &claims.role, ""),
        role: claims.role,
        subject: claims.sub,
        expires_at,
    }
}

// --- Pages ---

/// render_page
///
/// [Protected Route] Every gated page, including the fallback for unregistered paths.
/// Reaching this handler means the `Authorized` extractor let the navigation through; the
/// rendering layer receives the role and the menu it may show.
pub async fn render_page(
    Authorized(principal): Authorized,
    State(gate): State<GateState>,
    uri: Uri,
) -> Json<PageContext> {
    let path = uri.path().to_string();
    let navigation = navigation_for(gate.table(), principal.role, &path);

    Json(PageContext {
        path,
        role: Some(principal.role),
        navigation,
    })
}

/// public_page
///
/// [Public Route] Landing, forbidden and sign-up style pages. Never redirects; a valid
/// session only personalizes the context.
pub async fn public_page(
    State(gate): State<GateState>,
    session: SessionContext,
    uri: Uri,
) -> Json<PageContext> {
    let path = uri.path().to_string();
    let role = gate
        .identify(&session)
        .ok()
        .and_then(|claims| claims.role.parse::<Role>().ok());

    let navigation = role
        .map(|role| navigation_for(gate.table(), role, &path))
        .unwrap_or_default();

    Json(PageContext {
        path,
        role,
        navigation,
    })
}

// --- Session ---

/// login
///
/// [Public Route] Exchanges credentials for a token at the auth API and stores it in the
/// `token` cookie, with a lifetime bounded by the token's own `exp`.
#[utoipa::path(
    post,
    path = "/session/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = SessionInfo),
        (status = 401, description = "Credentials rejected"),
        (status = 502, description = "Auth API unavailable or issued an unusable token")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    session: SessionContext,
    Json(credentials): Json<LoginRequest>,
) -> Result<Response, StatusCode> {
    let token = state.auth_api.login(&credentials).await.map_err(|e| {
        tracing::warn!(error = %e, "login failed");
        match e {
            AuthApiError::Rejected(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_GATEWAY,
        }
    })?;

    // A token the gate cannot read would bounce every navigation back to the landing page.
    let claims = state.gate.decoder().decode(&token).map_err(|e| {
        tracing::error!(error = %e, "auth API issued a token the gate cannot decode");
        StatusCode::BAD_GATEWAY
    })?;

    tracing::info!(role = %claims.role, "session started");

    let expires_at = claims.expires_at();
    session.set(token);

    let info = session_info(state.gate.table(), claims);
    let mut response = Json(info).into_response();
    if let Some(cookie) = session.set_cookie_header(state.config.secure_cookies(), expires_at) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    Ok(response)
}

/// logout
///
/// [Public Route] Clears the `token` cookie and sends the browser back to the landing page.
/// The auth API is told in the background; its answer never delays the response.
#[utoipa::path(
    post,
    path = "/session/logout",
    responses((status = 303, description = "Session cleared, redirect to landing page"))
)]
pub async fn logout(State(state): State<AppState>, session: SessionContext) -> Response {
    if let Some(token) = session.get() {
        let auth_api = state.auth_api.clone();
        tokio::spawn(async move {
            if let Err(e) = auth_api.logout(&token).await {
                tracing::warn!(error = %e, "auth API logout failed");
            }
        });
    }

    session.clear();
    tracing::info!("session cleared");

    let mut response = Redirect::to(LOGIN_ROUTE).into_response();
    if let Some(cookie) = session.set_cookie_header(state.config.secure_cookies(), None) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// get_session
///
/// [Public Route] The decoded session for UI personalization. 401 when there is no usable
/// token, with the same decode rules the gate applies.
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Current session", body = SessionInfo),
        (status = 401, description = "No usable session token")
    )
)]
pub async fn get_session(
    State(gate): State<GateState>,
    session: SessionContext,
) -> Result<Json<SessionInfo>, StatusCode> {
    let claims = gate.identify(&session).map_err(|e| {
        if e != GateError::MissingToken {
            tracing::debug!(reason = %e, "session token rejected");
        }
        StatusCode::UNAUTHORIZED
    })?;

    Ok(Json(session_info(gate.table(), claims)))
}
