use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// Role
///
/// The closed set of roles a session token may carry. Extending the portal with a new
/// role means adding a variant here and an entry in the route table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("route table names unknown role '{0}'")]
    UnknownRole(String),

    #[error("route pattern '{0}' must start with '/'")]
    NotAbsolute(String),

    #[error("route pattern '{0}' may only use '*' as a trailing '/*' segment")]
    MisplacedWildcard(String),

    #[error("route table is not valid JSON: {0}")]
    Parse(String),
}

/// RoutePattern
///
/// A normalized path prefix. `/courses` and `/courses/*` both admit `/courses` itself and
/// anything nested below it. Matching is done per path segment, so `/courses` never admits
/// `/coursemanagement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    prefix: String,
}

impl RoutePattern {
    pub fn parse(raw: &str) -> Result<Self, RouteTableError> {
        if !raw.starts_with('/') {
            return Err(RouteTableError::NotAbsolute(raw.to_string()));
        }

        let body = raw.strip_suffix("/*").unwrap_or(raw);
        if body.contains('*') {
            return Err(RouteTableError::MisplacedWildcard(raw.to_string()));
        }

        Ok(Self {
            prefix: normalize_path(body).to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }

        let path = normalize_path(path);
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Drops trailing slashes, keeping the root path intact.
fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

const ADMIN_ROUTES: &[&str] = &[
    "/home",
    "/courses",
    "/coursemanagement",
    "/users",
    "/approve",
    "/account",
    "/checkout",
];

const USER_ROUTES: &[&str] = &["/home", "/courses", "/mycourses", "/account", "/checkout"];

/// RouteTable
///
/// Immutable role -> allowed-path mapping consulted by the access gate on every navigation.
/// Built once at startup and validated there; after construction it is total over
/// `Role::ALL`, so a known role never falls through to "missing".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: BTreeMap<Role, Vec<RoutePattern>>,
}

impl RouteTable {
    /// Builds a table from `(role, patterns)` pairs. Roles not mentioned get an empty set.
    pub fn new<I, P>(entries: I) -> Result<Self, RouteTableError>
    where
        I: IntoIterator<Item = (Role, P)>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut table: BTreeMap<Role, Vec<RoutePattern>> =
            Role::ALL.iter().map(|role| (*role, Vec::new())).collect();

        for (role, patterns) in entries {
            let slot = table.entry(role).or_default();
            for raw in patterns {
                slot.push(RoutePattern::parse(raw.as_ref())?);
            }
        }

        Ok(Self { entries: table })
    }

    /// Parses the JSON route table format: `{ "admin": ["/users", "/courses/*"], ... }`.
    ///
    /// Keys must name a known role; an unknown key rejects the whole table.
    pub fn from_json(raw: &str) -> Result<Self, RouteTableError> {
        let parsed: HashMap<String, Vec<String>> =
            serde_json::from_str(raw).map_err(|e| RouteTableError::Parse(e.to_string()))?;

        let mut entries = Vec::with_capacity(parsed.len());
        for (name, patterns) in parsed {
            let role = name
                .parse::<Role>()
                .map_err(|UnknownRole(name)| RouteTableError::UnknownRole(name))?;
            entries.push((role, patterns));
        }

        Self::new(entries)
    }

    /// The table the portal ships with, mirroring its sidebar.
    pub fn builtin() -> Self {
        let builtin = [(Role::Admin, ADMIN_ROUTES), (Role::User, USER_ROUTES)];
        let entries: BTreeMap<Role, Vec<RoutePattern>> = builtin
            .into_iter()
            .map(|(role, routes)| {
                let patterns: Vec<RoutePattern> = routes
                    .iter()
                    .map(|route| RoutePattern {
                        prefix: (*route).to_string(),
                    })
                    .collect();
                (role, patterns)
            })
            .collect();

        Self { entries }
    }

    /// Allowed patterns for a role. Empty for a role with no grants.
    pub fn patterns(&self, role: Role) -> &[RoutePattern] {
        self.entries.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn allows(&self, role: Role, path: &str) -> bool {
        self.patterns(role).iter().any(|pattern| pattern.matches(path))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::builtin()
    }
}
