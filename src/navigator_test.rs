use reqwest::Method;
use serde_json::json;

use super::*;
use crate::config::ClientConfig;
use crate::guard::RouteMeta;
use crate::identity::Identity;
use crate::mock_backend::{MockBackend, MockResponse, admin_probe, anonymous_probe, user_probe};
use crate::session::SessionState;
use crate::transport::Transport;

const ME: &str = "auth/me/";

fn session_with(mock: &Arc<MockBackend>, config: &ClientConfig) -> Arc<SessionCache> {
    let transport = Arc::new(Transport::new(mock.clone(), config));
    Arc::new(SessionCache::new(transport, config))
}

fn navigator(session: &Arc<SessionCache>) -> Navigator {
    Navigator::new(Arc::clone(session), RouteTable::admin_app(), Guard::default())
}

#[tokio::test]
async fn boot_to_admin_page_then_login() {
    let mock = MockBackend::new();
    mock.require_csrf("tok");
    mock.enqueue(Method::GET, ME, anonymous_probe());
    mock.respond(Method::GET, ME, admin_probe("ann"));
    mock.respond(Method::POST, "auth/login/", MockResponse::json(200, json!({ "ok": true })));
    let session = session_with(&mock, &ClientConfig::default());
    let nav = navigator(&session);

    let first = nav.navigate("/orders").await.unwrap();
    assert_eq!(first.path, "/login?next=/orders");
    assert_eq!(first.redirects, vec!["/login?next=/orders".to_string()]);
    assert_eq!(mock.calls_to(&Method::GET, ME), 1);

    let identity = session.login("ann", "secret").await.unwrap();
    assert!(identity.is_admin());
    assert_eq!(mock.calls_to(&Method::GET, ME), 2);

    let second = nav.navigate("/orders").await.unwrap();
    assert_eq!(second, Navigation { path: "/orders".into(), redirects: Vec::new() });
    assert_eq!(mock.calls_to(&Method::GET, ME), 2);
}

#[tokio::test]
async fn non_admin_lands_on_menu_not_login() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, ME, user_probe("bob"));
    let session = session_with(&mock, &ClientConfig::default());

    let nav = navigator(&session).navigate("/customers").await.unwrap();

    assert_eq!(nav.path, "/menu");
    assert_eq!(nav.redirects, vec!["/menu".to_string()]);
}

#[tokio::test]
async fn concurrent_first_navigations_probe_once() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, ME, admin_probe("ann"));
    mock.set_delay(std::time::Duration::from_millis(20));
    let session = session_with(&mock, &ClientConfig::default());
    let nav = navigator(&session);

    let results = futures::future::join_all(["/orders", "/menu", "/categories", "/"].map(|p| nav.navigate(p))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(mock.calls_to(&Method::GET, ME), 1);
}

#[tokio::test]
async fn root_alias_follows_to_menu() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, ME, admin_probe("ann"));
    let session = session_with(&mock, &ClientConfig::default());

    let nav = navigator(&session).navigate("/").await.unwrap();

    assert_eq!(nav.path, "/menu");
}

#[tokio::test]
async fn authenticated_visit_to_login_goes_to_landing() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, ME, user_probe("bob"));
    let session = session_with(&mock, &ClientConfig::default());

    assert_eq!(navigator(&session).navigate("/login").await.unwrap().path, "/menu");
}

#[tokio::test]
async fn pending_second_factor_goes_to_otp_page() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, ME, admin_probe("ann"));
    mock.respond(
        Method::GET,
        "2fa/otp-status/",
        MockResponse::json(200, json!({ "otp_good": false, "ttl_seconds": 0, "confirmed": true })),
    );
    let config = ClientConfig { two_factor: true, ..ClientConfig::default() };
    let session = session_with(&mock, &config);

    let nav = navigator(&session).navigate("/orders").await.unwrap();

    assert_eq!(nav.path, "/otp?next=/orders");
}

#[tokio::test]
async fn redirect_loop_is_bounded() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, ME, anonymous_probe());
    let session = session_with(&mock, &ClientConfig::default());
    let table = RouteTable::new().with_alias("/a", "/b").with_alias("/b", "/a");
    let nav = Navigator::new(Arc::clone(&session), table, Guard::default());

    let err = nav.navigate("/a").await.unwrap_err();

    assert!(matches!(err, NavigationError::RedirectLoop { ref path, .. } if path == "/a"));
}

#[tokio::test]
async fn resolved_session_navigates_without_network() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, ME, anonymous_probe());
    let session = session_with(&mock, &ClientConfig::default());
    session.resolve().await;
    let nav = navigator(&session);

    nav.navigate("/login").await.unwrap();
    nav.navigate("/menu").await.unwrap();

    assert_eq!(mock.calls_to(&Method::GET, ME), 1);
    assert_eq!(session.state(), SessionState::Resolved(Identity::anonymous()));
}

#[tokio::test]
async fn open_page_still_waits_for_resolution() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, ME, anonymous_probe());
    let session = session_with(&mock, &ClientConfig::default());
    let table = RouteTable::new().with_page("/about", RouteMeta::OPEN);
    let nav = Navigator::new(Arc::clone(&session), table, Guard::default());

    nav.navigate("/about").await.unwrap();

    assert!(session.state().is_resolved());
}
