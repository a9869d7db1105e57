use std::sync::Arc;

use reqwest::Method;
use serde_json::json;

use super::*;
use crate::config::ClientConfig;
use crate::error::ErrorCode;
use crate::mock_backend::{MockBackend, MockResponse, admin_probe};
use crate::session::SessionState;

fn client(mock: &Arc<MockBackend>) -> AdminClient {
    let config = ClientConfig { two_factor: true, ..ClientConfig::default() };
    AdminClient::with_backend(config, mock.clone())
}

#[test]
fn pending_means_confirmed_but_not_good() {
    assert!(OtpStatus { otp_good: false, ttl_seconds: 0, confirmed: true }.is_pending());
    assert!(!OtpStatus { otp_good: true, ttl_seconds: 60, confirmed: true }.is_pending());
    assert!(!OtpStatus::default().is_pending());
}

#[test]
fn code_shape() {
    assert!(is_well_formed("012345"));
    assert!(!is_well_formed("12345"));
    assert!(!is_well_formed("1234567"));
    assert!(!is_well_formed("12a456"));
    assert!(!is_well_formed("１２３４５６"));
}

#[tokio::test]
async fn status_decodes_partial_payload() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, "2fa/otp-status/", MockResponse::json(200, json!({ "otp_good": true })));
    let client = client(&mock);

    let status = status(&client).await.unwrap();

    assert_eq!(status, OtpStatus { otp_good: true, ttl_seconds: 0, confirmed: false });
}

#[tokio::test]
async fn malformed_code_sends_nothing() {
    let mock = MockBackend::new();
    let client = client(&mock);

    assert_eq!(verify(&client, "12 34").await.unwrap_err(), TwoFactorError::InvalidCode);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn verify_success_reprobes_session() {
    let mock = MockBackend::new();
    mock.require_csrf("tok");
    mock.respond(Method::GET, "auth/me/", admin_probe("ann"));
    mock.enqueue(
        Method::GET,
        "2fa/otp-status/",
        MockResponse::json(200, json!({ "otp_good": false, "ttl_seconds": 0, "confirmed": true })),
    );
    mock.respond(
        Method::GET,
        "2fa/otp-status/",
        MockResponse::json(200, json!({ "otp_good": true, "ttl_seconds": 3600, "confirmed": true })),
    );
    mock.respond(Method::POST, "2fa/otp-login/", MockResponse::json(200, json!({ "success": true, "ttl_seconds": 3600 })));
    let client = client(&mock);

    assert_eq!(client.navigate("/orders").await.unwrap().path, "/otp?next=/orders");

    let verification = verify(&client, " 123456 ").await.unwrap();
    assert_eq!(verification.ttl_seconds, 3600);
    assert_eq!(mock.last_call_to(&Method::POST, "2fa/otp-login/").unwrap().body, Some(json!({ "key": "123456" })));
    assert_eq!(client.session().state(), SessionState::Unknown);

    assert_eq!(client.navigate("/orders").await.unwrap().path, "/orders");
}

#[tokio::test]
async fn rejected_code_keeps_session() {
    let mock = MockBackend::new();
    mock.set_cookie("csrftoken", "tok");
    mock.respond(Method::GET, "auth/me/", admin_probe("ann"));
    mock.respond(Method::GET, "2fa/otp-status/", MockResponse::json(200, json!({ "confirmed": true })));
    mock.respond(Method::POST, "2fa/otp-login/", MockResponse::json(200, json!({ "success": false })));
    let client = client(&mock);
    client.resolve().await;

    assert_eq!(verify(&client, "000000").await.unwrap_err(), TwoFactorError::InvalidCode);
    assert!(client.session().state().is_resolved());
}

#[tokio::test]
async fn secret_and_reset() {
    let mock = MockBackend::new();
    mock.set_cookie("csrftoken", "tok");
    let payload = json!({ "secret": "JBSWY3DPEHPK3PXP", "otpauth_url": "otpauth://totp/Cafe:ann?secret=JBSWY3DPEHPK3PXP" });
    mock.respond(Method::GET, "2fa/otp-secret/", MockResponse::json(200, payload.clone()));
    mock.respond(Method::POST, "2fa/otp-reset/", MockResponse::json(200, payload));
    let client = client(&mock);

    assert_eq!(secret(&client).await.unwrap().secret, "JBSWY3DPEHPK3PXP");
    let rotated = reset(&client).await.unwrap();
    assert!(rotated.otpauth_url.starts_with("otpauth://"));
    assert_eq!(mock.last_call_to(&Method::POST, "2fa/otp-reset/").unwrap().header("X-CSRFToken"), Some("tok"));
}

#[tokio::test]
async fn http_failure_is_wrapped() {
    let mock = MockBackend::new();
    mock.respond(Method::GET, "2fa/otp-status/", MockResponse::network_error());
    let client = client(&mock);

    let err = status(&client).await.unwrap_err();

    assert!(matches!(err, TwoFactorError::Http(ref e) if e.is_network()));
    assert_eq!(err.error_code(), "E_NETWORK");
}
