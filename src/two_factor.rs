//! One-time-password second factor.
//!
//! The backend marks a session "OTP good" for a limited time after a
//! successful `verify`. Until then an identity with a confirmed secret is
//! `otp_pending` and the guard sends it to the second-factor page.

use serde::{Deserialize, Serialize};

use crate::client::AdminClient;
use crate::error::TwoFactorError;
use crate::transport::RequestOptions;

const CODE_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpStatus {
    pub otp_good: bool,
    pub ttl_seconds: u64,
    /// A secret has been provisioned and confirmed for this user.
    pub confirmed: bool,
}

impl OtpStatus {
    /// Second factor required but not yet supplied.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.confirmed && !self.otp_good
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpVerification {
    pub success: bool,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpSecret {
    pub secret: String,
    pub otpauth_url: String,
}

/// # Errors
///
/// Returns [`TwoFactorError::Http`] if the request fails.
pub async fn status(client: &AdminClient) -> Result<OtpStatus, TwoFactorError> {
    let path = &client.config().endpoints.otp_status;
    Ok(client.get(path, RequestOptions::default()).await?.decode()?)
}

/// Submit a one-time code. On success the session is invalidated so the
/// next guard check re-probes and sees the second factor satisfied.
///
/// # Errors
///
/// - [`TwoFactorError::InvalidCode`] if `code` is not six digits (no request
///   is sent) or the backend rejects it.
/// - [`TwoFactorError::Http`] if the request fails.
pub async fn verify(client: &AdminClient, code: &str) -> Result<OtpVerification, TwoFactorError> {
    let code = code.trim();
    if !is_well_formed(code) {
        return Err(TwoFactorError::InvalidCode);
    }

    let path = &client.config().endpoints.otp_login;
    let body = serde_json::json!({ "key": code });
    let verification: OtpVerification = client.post(path, Some(body), RequestOptions::default()).await?.decode()?;
    if !verification.success {
        tracing::info!("one-time code rejected");
        return Err(TwoFactorError::InvalidCode);
    }

    tracing::info!(ttl_seconds = verification.ttl_seconds, "second factor verified");
    client.session().invalidate();
    Ok(verification)
}

/// Fetch (creating if needed) the user's TOTP secret.
///
/// # Errors
///
/// Returns [`TwoFactorError::Http`] if the request fails.
pub async fn secret(client: &AdminClient) -> Result<OtpSecret, TwoFactorError> {
    let path = &client.config().endpoints.otp_secret;
    Ok(client.get(path, RequestOptions::default()).await?.decode()?)
}

/// Rotate the user's TOTP secret.
///
/// # Errors
///
/// Returns [`TwoFactorError::Http`] if the request fails.
pub async fn reset(client: &AdminClient) -> Result<OtpSecret, TwoFactorError> {
    let path = &client.config().endpoints.otp_reset;
    let secret: OtpSecret = client.post(path, None, RequestOptions::default()).await?.decode()?;
    client.session().invalidate();
    Ok(secret)
}

fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[path = "two_factor_test.rs"]
mod tests;
