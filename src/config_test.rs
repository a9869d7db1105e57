use super::*;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: [&str; 7] = [
    "ADMIN_ORIGIN",
    "ADMIN_API_BASE",
    "ADMIN_CSRF_COOKIE",
    "ADMIN_CSRF_HEADER",
    "ADMIN_TWO_FACTOR",
    "ADMIN_REQUEST_TIMEOUT_SECS",
    "ADMIN_CONNECT_TIMEOUT_SECS",
];

/// # Safety
/// Callers hold `ENV_LOCK`; no other test module touches these variables.
unsafe fn clear_admin_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

// =============================================================================
// from_env
// =============================================================================

#[test]
fn from_env_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_admin_env() };

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg, ClientConfig::default());
    assert_eq!(cfg.origin, DEFAULT_ORIGIN);
    assert_eq!(cfg.api_base, "/api/");
    assert_eq!(cfg.csrf_cookie, "csrftoken");
    assert_eq!(cfg.csrf_header, "X-CSRFToken");
    assert!(!cfg.two_factor);
}

#[test]
fn from_env_parses_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_admin_env();
        std::env::set_var("ADMIN_ORIGIN", "https://cafe.example.test/");
        std::env::set_var("ADMIN_API_BASE", "backend/v2");
        std::env::set_var("ADMIN_TWO_FACTOR", "yes");
        std::env::set_var("ADMIN_REQUEST_TIMEOUT_SECS", "5");
        std::env::set_var("ADMIN_CONNECT_TIMEOUT_SECS", "2");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.origin, "https://cafe.example.test");
    assert_eq!(cfg.api_base, "/backend/v2/");
    assert!(cfg.two_factor);
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 5, connect_secs: 2 });

    unsafe { clear_admin_env() };
}

#[test]
fn from_env_rejects_bad_timeout() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_admin_env();
        std::env::set_var("ADMIN_REQUEST_TIMEOUT_SECS", "soon");
    }

    let err = ClientConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { var: "ADMIN_REQUEST_TIMEOUT_SECS", .. }));

    unsafe { clear_admin_env() };
}

#[test]
fn from_env_rejects_origin_without_scheme() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_admin_env();
        std::env::set_var("ADMIN_ORIGIN", "cafe.example.test");
    }

    let err = ClientConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidOrigin(_)));

    unsafe { clear_admin_env() };
}

// =============================================================================
// helpers
// =============================================================================

#[test]
fn api_base_normalization() {
    assert_eq!(normalize_api_base("/api/"), "/api/");
    assert_eq!(normalize_api_base("api"), "/api/");
    assert_eq!(normalize_api_base("//api//"), "/api/");
    assert_eq!(normalize_api_base(""), "/");
}

#[test]
fn url_joins_relative_and_absolute_paths() {
    let cfg = ClientConfig::default();
    assert_eq!(cfg.url("auth/me/"), "http://127.0.0.1:8000/api/auth/me/");
    assert_eq!(cfg.url("/healthz"), "http://127.0.0.1:8000/healthz");
}

#[test]
fn parse_bool_variants() {
    assert_eq!(parse_bool("ON"), Some(true));
    assert_eq!(parse_bool(" 0 "), Some(false));
    assert_eq!(parse_bool("maybe"), None);
}
