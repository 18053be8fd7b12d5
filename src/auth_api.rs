use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::{models::LoginRequest, session::SessionToken};

#[derive(Debug, Error)]
pub enum AuthApiError {
    /// The auth API refused the request (bad credentials, unknown account, ...).
    #[error("auth API rejected the request with status {0}")]
    Rejected(u16),

    #[error("auth API failed with status {0}")]
    Upstream(u16),

    #[error("auth API response carried no token")]
    MissingToken,

    #[error("auth API request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl AuthApiError {
    fn from_status(status: StatusCode) -> Self {
        if status.is_client_error() {
            AuthApiError::Rejected(status.as_u16())
        } else {
            AuthApiError::Upstream(status.as_u16())
        }
    }
}

/// AuthApi
///
/// The contract with the remote authentication service. The gateway only ever asks it to
/// issue a token (login) and to forget one (logout); everything else about sessions is
/// decided locally from the token's claims.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &LoginRequest) -> Result<SessionToken, AuthApiError>;

    /// Best effort. Callers do not wait on the outcome before clearing the local session.
    async fn logout(&self, token: &SessionToken) -> Result<(), AuthApiError>;
}

pub type AuthApiState = Arc<dyn AuthApi>;

/// Shape of the login response. The token is accepted at the top level or wrapped in the
/// API's usual `data` envelope.
#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
    data: Option<LoginData>,
}

#[derive(Deserialize)]
struct LoginData {
    token: Option<String>,
}

impl LoginResponse {
    fn into_token(self) -> Option<String> {
        self.token
            .or_else(|| self.data.and_then(|data| data.token))
            .filter(|token| !token.is_empty())
    }
}

/// HttpAuthApi
///
/// `AuthApi` over HTTP, talking to `{base_url}/api/v1/auth/*`.
#[derive(Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &LoginRequest) -> Result<SessionToken, AuthApiError> {
        let response = self
            .client
            .post(format!("{}/api/v1/auth/login", self.base_url))
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthApiError::from_status(status));
        }

        response
            .json::<LoginResponse>()
            .await?
            .into_token()
            .map(SessionToken::from)
            .ok_or(AuthApiError::MissingToken)
    }

    async fn logout(&self, token: &SessionToken) -> Result<(), AuthApiError> {
        let response = self
            .client
            .post(format!("{}/api/v1/auth/logout", self.base_url))
            .bearer_auth(token.as_str())
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AuthApiError::from_status(status))
        }
    }
}

/// MockAuthApi
///
/// In-memory `AuthApi` for tests and offline local runs: issues a fixed token (or rejects
/// every login) and counts logout calls.
#[derive(Default)]
pub struct MockAuthApi {
    token: Option<String>,
    logouts: AtomicUsize,
}

impl MockAuthApi {
    pub fn issuing(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            logouts: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self::default()
    }

    pub fn logout_calls(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn login(&self, _credentials: &LoginRequest) -> Result<SessionToken, AuthApiError> {
        self.token
            .clone()
            .map(SessionToken::from)
            .ok_or(AuthApiError::Rejected(StatusCode::UNAUTHORIZED.as_u16()))
    }

    async fn logout(&self, _token: &SessionToken) -> Result<(), AuthApiError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
