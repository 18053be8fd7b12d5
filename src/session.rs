use std::{
    convert::Infallible,
    fmt,
    sync::{Mutex, PoisonError},
};

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use chrono::{DateTime, Utc};

/// Name of the cookie the portal keeps its bearer credential in.
pub const TOKEN_COOKIE: &str = "token";

/// SessionToken
///
/// The bearer credential issued by the auth API at login. Treated as an opaque string
/// everywhere except the gate's decoder. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

impl From<String> for SessionToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// TokenStore
///
/// Read/replace/remove access to the single session credential. None of these operations
/// fail; an unreadable or missing credential is simply absent. Expiry is not tracked here,
/// it is a property of the token's claims and only interpreted by the access gate.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<SessionToken>;
    fn set(&self, token: SessionToken);
    fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingWrite {
    Set,
    Cleared,
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<SessionToken>,
    write: Option<PendingWrite>,
}

/// SessionContext
///
/// The per-request session, threaded explicitly into the gate and the session handlers.
/// It is seeded from the `token` cookie (or an `Authorization: Bearer` header for API
/// clients) and records any `set`/`clear` so the response can carry the matching
/// `Set-Cookie` header.
#[derive(Debug, Default)]
pub struct SessionContext {
    state: Mutex<SessionState>,
}

impl SessionContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_token(token: SessionToken) -> Self {
        Self {
            state: Mutex::new(SessionState {
                token: Some(token),
                write: None,
            }),
        }
    }

    /// Resolves the credential presented with a request. The cookie wins over the header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match token_from_cookie(headers).or_else(|| token_from_bearer(headers)) {
            Some(token) => Self::with_token(token),
            None => Self::empty(),
        }
    }

    /// Builds the `Set-Cookie` value reflecting the last write, if any.
    ///
    /// A stored token lives until its own expiry (`expires_at`); without one the cookie is a
    /// browser-session cookie.
    pub fn set_cookie_header(
        &self,
        secure: bool,
        expires_at: Option<DateTime<Utc>>,
    ) -> Option<HeaderValue> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let cookie = match (state.write?, state.token.as_ref()) {
            (PendingWrite::Set, Some(token)) => {
                let mut cookie = format!("{TOKEN_COOKIE}={}; Path=/; SameSite=Lax", token.as_str());
                if secure {
                    cookie.push_str("; Secure");
                }
                if let Some(expires_at) = expires_at {
                    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
                    cookie.push_str(&format!("; Max-Age={max_age}"));
                }
                cookie
            }
            _ => format!("{TOKEN_COOKIE}=; Path=/; Max-Age=0"),
        };

        HeaderValue::from_str(&cookie).ok()
    }
}

impl TokenStore for SessionContext {
    fn get(&self) -> Option<SessionToken> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    fn set(&self, token: SessionToken) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.token = Some(token);
        state.write = Some(PendingWrite::Set);
    }

    fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.token = None;
        state.write = Some(PendingWrite::Cleared);
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

fn token_from_cookie(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(SessionToken::new)
}

fn token_from_bearer(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(SessionToken::new)
}
