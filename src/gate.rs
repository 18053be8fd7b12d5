use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use thiserror::Error;

use crate::{
    auth::{Claims, Principal, TokenDecoder},
    config::AppConfig,
    roles::RouteTable,
    session::{SessionContext, TokenStore},
};

/// Where a navigation without a usable session is sent: the public landing page.
pub const LOGIN_ROUTE: &str = "/";
/// Where a navigation the role may not make is sent.
pub const FORBIDDEN_ROUTE: &str = "/403";

/// GateError
///
/// Why a navigation was refused. Every variant ends in a redirect, never in an error page;
/// `redirect_route` names the destination.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("no session token present")]
    MissingToken,

    #[error("session token could not be decoded: {0}")]
    MalformedToken(String),

    #[error("session token has expired")]
    ExpiredToken,

    #[error("role '{role}' may not enter '{path}'")]
    UnauthorizedRole { role: String, path: String },
}

impl GateError {
    pub fn redirect_route(&self) -> &'static str {
        match self {
            GateError::UnauthorizedRole { .. } => FORBIDDEN_ROUTE,
            GateError::MissingToken | GateError::MalformedToken(_) | GateError::ExpiredToken => {
                LOGIN_ROUTE
            }
        }
    }
}

/// Decision
///
/// The outcome handed to the rendering layer for one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Principal),
    RedirectToLogin,
    RedirectToForbidden,
}

impl Decision {
    pub fn redirect_route(&self) -> Option<&'static str> {
        match self {
            Decision::Allow(_) => None,
            Decision::RedirectToLogin => Some(LOGIN_ROUTE),
            Decision::RedirectToForbidden => Some(FORBIDDEN_ROUTE),
        }
    }
}

impl From<Result<Principal, GateError>> for Decision {
    fn from(outcome: Result<Principal, GateError>) -> Self {
        match outcome {
            Ok(principal) => Decision::Allow(principal),
            Err(GateError::UnauthorizedRole { .. }) => Decision::RedirectToForbidden,
            Err(_) => Decision::RedirectToLogin,
        }
    }
}

/// AccessGate
///
/// Role-based route guard evaluated before any protected page renders.
///
/// Evaluation is local and synchronous: read the token from the session, decode its claims,
/// then check the requested path against the role's allowed patterns. The gate holds no
/// per-navigation state, so evaluating the same token and path twice yields the same answer.
pub struct AccessGate {
    decoder: TokenDecoder,
    table: RouteTable,
}

/// Shared handle to the gate, pulled out of the application state by `FromRef`.
pub type GateState = Arc<AccessGate>;

impl AccessGate {
    pub fn new(decoder: TokenDecoder, table: RouteTable) -> Self {
        Self { decoder, table }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let decoder = TokenDecoder::new(config.jwt_secret.as_deref(), config.check_expiry);
        Self::new(decoder, config.route_table.clone())
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn decoder(&self) -> &TokenDecoder {
        &self.decoder
    }

    /// Reads and decodes the session's token without looking at any route.
    pub fn identify(&self, store: &dyn TokenStore) -> Result<Claims, GateError> {
        let token = store.get().ok_or(GateError::MissingToken)?;
        self.decoder.decode(&token)
    }

    pub fn authorize(&self, store: &dyn TokenStore, path: &str) -> Result<Principal, GateError> {
        let claims = self.identify(store)?;

        let unauthorized = |role: &str| GateError::UnauthorizedRole {
            role: role.to_string(),
            path: path.to_string(),
        };

        let role = claims.role.clone();
        let principal = Principal::try_from(claims).map_err(|_| unauthorized(&role))?;

        if has_dot_segment(path) || !self.table.allows(principal.role, path) {
            return Err(unauthorized(&role));
        }

        Ok(principal)
    }

    pub fn evaluate(&self, store: &dyn TokenStore, path: &str) -> Decision {
        let outcome = self.authorize(store, path);

        match &outcome {
            Ok(principal) => {
                tracing::debug!(role = %principal.role, path, "navigation allowed");
            }
            Err(e) => {
                tracing::info!(path, reason = %e, redirect = e.redirect_route(), "navigation denied");
            }
        }

        Decision::from(outcome)
    }
}

/// True when any segment is `.` or `..`, also in `%2e` form. Such a path may resolve to a
/// page other than the one it names, so no pattern is allowed to admit it.
fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Authorized Extractor Result
///
/// A principal that passed the gate for the path of the current request. Taking it as a
/// handler argument is what makes a page protected.
///
/// Rejection: a temporary redirect to `/` (no usable token) or `/403` (role not allowed).
#[derive(Debug, Clone)]
pub struct Authorized(pub Principal);

impl<S> FromRequestParts<S> for Authorized
where
    S: Send + Sync,
    GateState: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by the gate middleware for this request.
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(Authorized(principal.clone()));
        }

        let gate = GateState::from_ref(state);
        let session = SessionContext::from_headers(&parts.headers);

        match gate.evaluate(&session, parts.uri.path()) {
            Decision::Allow(principal) => {
                parts.extensions.insert(principal.clone());
                Ok(Authorized(principal))
            }
            denied => Err(Redirect::temporary(
                denied.redirect_route().unwrap_or(LOGIN_ROUTE),
            )),
        }
    }
}
