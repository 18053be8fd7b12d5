use course_portal::{
    AccessGate, Decision, GateError, Role, RouteTable, SessionContext, SessionToken,
    auth::{Claims, TokenDecoder},
    gate::{FORBIDDEN_ROUTE, LOGIN_ROUTE},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::SystemTime;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn sign<T: serde::Serialize>(claims: &T, secret: &str) -> String {
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &key).unwrap()
}

fn create_token(role: &str, exp_offset: i64) -> String {
    let claims = Claims {
        role: role.to_string(),
        sub: Some("user-42".to_string()),
        iat: Some(now()),
        exp: Some((now() as i64 + exp_offset) as u64),
    };
    sign(&claims, TEST_JWT_SECRET)
}

fn session(token: &str) -> SessionContext {
    SessionContext::with_token(SessionToken::new(token))
}

fn gate() -> AccessGate {
    AccessGate::new(
        TokenDecoder::new(Some(TEST_JWT_SECRET), true),
        RouteTable::builtin(),
    )
}

// --- Scenarios ---

#[test]
fn test_user_is_forbidden_from_course_management() {
    let decision = gate().evaluate(&session(&create_token("user", 3600)), "/coursemanagement");
    assert_eq!(decision, Decision::RedirectToForbidden);
    assert_eq!(decision.redirect_route(), Some(FORBIDDEN_ROUTE));
}

#[test]
fn test_admin_may_open_users() {
    let decision = gate().evaluate(&session(&create_token("admin", 3600)), "/users");
    match decision {
        Decision::Allow(principal) => {
            assert_eq!(principal.role, Role::Admin);
            assert_eq!(principal.subject.as_deref(), Some("user-42"));
            assert!(principal.expires_at.is_some());
        }
        other => panic!("expected Allow, got {:?}", other),
    }
}

#[test]
fn test_missing_token_redirects_to_login() {
    let gate = gate();
    let empty = SessionContext::empty();

    assert_eq!(gate.evaluate(&empty, "/home"), Decision::RedirectToLogin);
    assert_eq!(gate.authorize(&empty, "/home"), Err(GateError::MissingToken));
    assert_eq!(GateError::MissingToken.redirect_route(), LOGIN_ROUTE);
}

#[test]
fn test_admin_is_forbidden_from_unknown_route() {
    let gate = gate();
    let admin = session(&create_token("admin", 3600));

    assert_eq!(gate.evaluate(&admin, "/unknown-route"), Decision::RedirectToForbidden);
    assert!(matches!(
        gate.authorize(&admin, "/unknown-route"),
        Err(GateError::UnauthorizedRole { role, path }) if role == "admin" && path == "/unknown-route"
    ));
}

// --- Decode Failures ---

#[test]
fn test_malformed_token_redirects_to_login() {
    let gate = gate();

    for garbage in ["not-a-jwt", "a.b.c", "", "..."] {
        let store = session(garbage);
        assert_eq!(gate.evaluate(&store, "/home"), Decision::RedirectToLogin);
        assert!(matches!(
            gate.authorize(&store, "/home"),
            Err(GateError::MalformedToken(_))
        ));
    }
}

#[test]
fn test_tampered_signature_redirects_to_login() {
    let claims = Claims {
        role: "admin".to_string(),
        sub: None,
        iat: None,
        exp: Some(now() + 3600),
    };
    let forged = sign(&claims, "someone-elses-secret");

    let outcome = gate().authorize(&session(&forged), "/users");
    assert!(matches!(outcome, Err(GateError::MalformedToken(_))));
}

#[test]
fn test_expired_token_redirects_to_login() {
    let store = session(&create_token("admin", -3600));

    assert_eq!(gate().authorize(&store, "/users"), Err(GateError::ExpiredToken));
    assert_eq!(gate().evaluate(&store, "/users"), Decision::RedirectToLogin);
}

#[test]
fn test_token_expired_seconds_ago_is_rejected() {
    let store = session(&create_token("admin", -5));

    assert_eq!(gate().authorize(&store, "/users"), Err(GateError::ExpiredToken));
    assert_eq!(gate().evaluate(&store, "/users"), Decision::RedirectToLogin);
}

#[test]
fn test_decode_only_mode_still_checks_expiry() {
    let decode_only = AccessGate::new(TokenDecoder::new(None, true), RouteTable::builtin());
    let expired = Claims {
        role: "admin".to_string(),
        sub: None,
        iat: None,
        exp: Some(now() - 5),
    };
    let no_exp = sign(&serde_json::json!({ "role": "admin" }), "any-secret-at-all");

    assert_eq!(
        decode_only.authorize(&session(&sign(&expired, "any-secret-at-all")), "/users"),
        Err(GateError::ExpiredToken)
    );
    assert!(matches!(
        decode_only.authorize(&session(&no_exp), "/users"),
        Err(GateError::MalformedToken(_))
    ));

    let lenient = AccessGate::new(TokenDecoder::new(None, false), RouteTable::builtin());
    assert!(matches!(
        lenient.evaluate(&session(&no_exp), "/users"),
        Decision::Allow(_)
    ));
}

#[test]
fn test_expiry_check_can_be_disabled() {
    let lenient = AccessGate::new(
        TokenDecoder::new(Some(TEST_JWT_SECRET), false),
        RouteTable::builtin(),
    );
    let store = session(&create_token("admin", -3600));

    assert!(matches!(lenient.evaluate(&store, "/users"), Decision::Allow(_)));
    assert!(!lenient.decoder().checks_expiry());
}

#[test]
fn test_token_without_exp_is_rejected_when_expiry_is_checked() {
    let token = sign(&serde_json::json!({ "role": "admin" }), TEST_JWT_SECRET);

    let outcome = gate().authorize(&session(&token), "/users");
    assert!(matches!(outcome, Err(GateError::MalformedToken(_))));
}

#[test]
fn test_token_without_role_is_malformed() {
    let token = sign(&serde_json::json!({ "exp": now() + 3600 }), TEST_JWT_SECRET);

    let outcome = gate().authorize(&session(&token), "/home");
    assert!(matches!(outcome, Err(GateError::MalformedToken(_))));
}

#[test]
fn test_decode_only_mode_ignores_signature() {
    let decode_only = AccessGate::new(TokenDecoder::new(None, true), RouteTable::builtin());
    let claims = Claims {
        role: "user".to_string(),
        sub: None,
        iat: None,
        exp: Some(now() + 3600),
    };
    let token = sign(&claims, "any-secret-at-all");

    assert!(!decode_only.decoder().verifies_signature());
    assert!(matches!(
        decode_only.evaluate(&session(&token), "/courses"),
        Decision::Allow(_)
    ));
    assert_eq!(
        decode_only.evaluate(&session("garbage"), "/courses"),
        Decision::RedirectToLogin
    );
}

// --- Roles & Matching ---

#[test]
fn test_unknown_role_is_denied_everything() {
    let gate = gate();
    let guest = session(&create_token("guest", 3600));

    for path in ["/home", "/courses", "/users"] {
        assert_eq!(gate.evaluate(&guest, path), Decision::RedirectToForbidden);
    }
}

#[test]
fn test_nested_paths_follow_their_prefix() {
    let gate = gate();
    let user = session(&create_token("user", 3600));

    assert!(matches!(
        gate.evaluate(&user, "/courses/42/onlineregister"),
        Decision::Allow(_)
    ));
    assert!(matches!(gate.evaluate(&user, "/courses/"), Decision::Allow(_)));
    assert_eq!(gate.evaluate(&user, "/coursesX"), Decision::RedirectToForbidden);
}

#[test]
fn test_dot_segment_paths_are_forbidden() {
    let gate = gate();
    let user = session(&create_token("user", 3600));
    let admin = session(&create_token("admin", 3600));

    for path in [
        "/courses/../users",
        "/courses/%2e%2e/coursemanagement",
        "/home/./../approve",
        "/courses/%2E%2e/approve",
        "/courses/.",
    ] {
        assert!(matches!(
            gate.authorize(&user, path),
            Err(GateError::UnauthorizedRole { role, .. }) if role == "user"
        ), "path={path}");
    }

    // Refused even when the resolved page would be allowed.
    assert_eq!(gate.evaluate(&admin, "/users/../users"), Decision::RedirectToForbidden);
    // Dots inside a segment are ordinary characters.
    assert!(matches!(gate.evaluate(&user, "/courses/v1..2"), Decision::Allow(_)));
    // No session still means login first.
    assert_eq!(
        gate.evaluate(&SessionContext::empty(), "/courses/../users"),
        Decision::RedirectToLogin
    );
}

#[test]
fn test_decision_agrees_with_route_table_for_every_role() {
    let gate = gate();
    let table = RouteTable::builtin();
    let paths = [
        "/home",
        "/courses",
        "/courses/7",
        "/mycourses",
        "/coursemanagement",
        "/users",
        "/users/3/edit",
        "/approve",
        "/account",
        "/checkout/9",
        "/unknown-route",
        "/",
    ];

    for role in Role::ALL {
        let store = session(&create_token(role.as_str(), 3600));
        for path in paths {
            let allowed = matches!(gate.evaluate(&store, path), Decision::Allow(_));
            assert_eq!(allowed, table.allows(role, path), "role={role} path={path}");
        }
    }
}

#[test]
fn test_evaluation_is_idempotent() {
    let gate = gate();
    let cases = [
        (Some(create_token("user", 3600)), "/coursemanagement"),
        (Some(create_token("admin", 3600)), "/users"),
        (Some("garbage".to_string()), "/home"),
        (None, "/home"),
    ];

    for (token, path) in cases {
        let store = match &token {
            Some(token) => session(token),
            None => SessionContext::empty(),
        };
        let first = gate.evaluate(&store, path);
        let second = gate.evaluate(&store, path);
        assert_eq!(first, second);
    }
}

#[test]
fn test_custom_table_replaces_builtin_grants() {
    let table = RouteTable::new([(Role::User, vec!["/reports/*"])]).unwrap();
    let gate = AccessGate::new(TokenDecoder::new(Some(TEST_JWT_SECRET), true), table);

    let user = session(&create_token("user", 3600));
    let admin = session(&create_token("admin", 3600));

    assert!(matches!(gate.evaluate(&user, "/reports/2024"), Decision::Allow(_)));
    assert_eq!(gate.evaluate(&user, "/home"), Decision::RedirectToForbidden);
    // Admin is absent from the table and therefore denied everything.
    assert_eq!(gate.evaluate(&admin, "/home"), Decision::RedirectToForbidden);
}
