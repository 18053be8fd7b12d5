use std::{env, fs, io};

use thiserror::Error;

use crate::roles::{RouteTable, RouteTableError};

/// AppConfig
///
/// Holds the gateway's entire configuration state. Loaded once at startup, immutable
/// afterwards, and pulled into handlers through `FromRef`.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format, cookie flags and which settings are mandatory.
    pub env: Env,
    // HS256 secret shared with the auth API. When absent, token signatures are not verified.
    pub jwt_secret: Option<String>,
    // Reject tokens whose `exp` claim lies in the past.
    pub check_expiry: bool,
    // Base URL of the auth API (login/logout).
    pub auth_api_url: String,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Role -> allowed route patterns, validated at load time.
    pub route_table: RouteTable,
}

/// Env
///
/// Defines the runtime context: a relaxed local setup or a hardened production one.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingVar(&'static str),

    #[error("{var} must be 'true' or 'false', got '{value}'")]
    InvalidFlag { var: &'static str, value: String },

    #[error("failed to read route table at {path}: {source}")]
    RouteTableRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    RouteTable(#[from] RouteTableError),
}

const DEFAULT_AUTH_API_URL: &str = "http://localhost:50100";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Default for AppConfig {
    /// Local settings with the built-in route table, used for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: None,
            check_expiry: true,
            auth_api_url: DEFAULT_AUTH_API_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            route_table: RouteTable::builtin(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment. Fails fast when production is
    /// missing its secret or when the route table names an unknown role.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `load`, reading variables through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        // The production secret is mandatory; locally the portal's decode-only behaviour is allowed.
        let jwt_secret = lookup("JWT_SECRET").filter(|secret| !secret.is_empty());
        if env == Env::Production && jwt_secret.is_none() {
            return Err(ConfigError::MissingVar("JWT_SECRET"));
        }

        let check_expiry = match lookup("GATE_CHECK_EXPIRY") {
            None => true,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidFlag {
                        var: "GATE_CHECK_EXPIRY",
                        value,
                    });
                }
            },
        };

        let route_table = match lookup("ROUTE_TABLE_PATH") {
            Some(path) => {
                let raw = fs::read_to_string(&path)
                    .map_err(|source| ConfigError::RouteTableRead { path, source })?;
                RouteTable::from_json(&raw)?
            }
            None => RouteTable::builtin(),
        };

        Ok(Self {
            env,
            jwt_secret,
            check_expiry,
            auth_api_url: lookup("AUTH_API_URL")
                .unwrap_or_else(|| DEFAULT_AUTH_API_URL.to_string()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            route_table,
        })
    }

    /// Cookies only travel over HTTPS in production.
    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }
}
