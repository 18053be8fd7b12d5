use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::roles::Role;

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for `POST /session/login`, forwarded unchanged to the auth API.
/// No `Debug`: the password must never end up in a log line.
#[derive(Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[schema(example = "student@example.com")]
    pub email: String,
    pub password: String,
}

// --- Session & Page Schemas (Output) ---

/// SessionInfo
///
/// What the front-end learns about the current session (`GET /session`, `POST /session/login`).
/// `role` is the raw claim; `navigation` is empty when the role is not one the portal knows.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionInfo {
    pub role: String,
    pub subject: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub navigation: Vec<NavItem>,
}

/// PageContext
///
/// Handed to the rendering layer once a navigation is allowed (or for public pages).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageContext {
    pub path: String,
    /// The decoded role, absent on public pages visited without a session.
    pub role: Option<Role>,
    pub navigation: Vec<NavItem>,
}

/// NavItem
///
/// One sidebar entry the current role is allowed to follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavItem {
    pub label: String,
    pub path: String,
    // True when the current page sits at or below this entry.
    pub active: bool,
}
