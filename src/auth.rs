use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, dangerous, decode, errors::ErrorKind,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};

use crate::{
    gate::GateError,
    roles::{Role, UnknownRole},
    session::SessionToken,
};

/// Claims
///
/// The payload the portal reads out of a session token. Only `role` is mandatory; the auth
/// API normally also sets `exp`, and `sub`/`iat` are carried through when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The RBAC field: 'user' or 'admin'. Any other value is denied every protected route.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration Time (exp), seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp
            .and_then(|exp| i64::try_from(exp).ok())
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Principal
///
/// The identity resolved from a decoded token whose role is one the portal knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub role: Role,
    pub subject: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<Claims> for Principal {
    type Error = UnknownRole;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = claims.role.parse::<Role>()?;
        let expires_at = claims.expires_at();

        Ok(Self {
            role,
            subject: claims.sub,
            expires_at,
        })
    }
}

/// TokenDecoder
///
/// Decodes session tokens locally, without a round-trip to the auth API.
///
/// With a secret configured the HS256 signature is verified, so a tampered token fails to
/// decode. Without one only the token's shape and claims are checked. Expiry checking is a
/// separate switch: when on, a token must carry `exp` and it must not lie in the past. No
/// leeway is granted, so the gate and the cookie's `Max-Age` expire a session together.
#[derive(Clone)]
pub struct TokenDecoder {
    // None in decode-only mode.
    key: Option<DecodingKey>,
    validation: Validation,
    check_expiry: bool,
}

impl TokenDecoder {
    pub fn new(secret: Option<&str>, check_expiry: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.validate_exp = check_expiry;
        validation.leeway = 0;
        if !check_expiry {
            validation.required_spec_claims.clear();
        }

        Self {
            key: secret.map(|secret| DecodingKey::from_secret(secret.as_bytes())),
            validation,
            check_expiry,
        }
    }

    pub fn verifies_signature(&self) -> bool {
        self.key.is_some()
    }

    pub fn checks_expiry(&self) -> bool {
        self.check_expiry
    }

    pub fn decode(&self, token: &SessionToken) -> Result<Claims, GateError> {
        let Some(key) = &self.key else {
            let claims = dangerous::insecure_decode::<Claims>(token.as_str())
                .map(|data| data.claims)
                .map_err(|e| GateError::MalformedToken(e.to_string()))?;
            return self.check_exp(claims);
        };

        decode::<Claims>(token.as_str(), key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => GateError::ExpiredToken,
                _ => GateError::MalformedToken(e.to_string()),
            })
    }

    /// Expiry rule for decode-only mode, matching what `Validation` enforces on signed tokens.
    fn check_exp(&self, claims: Claims) -> Result<Claims, GateError> {
        if !self.check_expiry {
            return Ok(claims);
        }

        match claims.exp {
            None => Err(GateError::MalformedToken(
                "missing required claim: exp".to_string(),
            )),
            Some(exp) if exp < get_current_timestamp() => Err(GateError::ExpiredToken),
            Some(_) => Ok(claims),
        }
    }
}
