//! The recognized principal and probe-payload normalization.
//!
//! An `Identity` is replaced wholesale on every probe, login, or logout.
//! Fields are private so the anonymous invariant (no username, no roles,
//! no pending second factor) cannot be broken field-by-field.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::transport::Body;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    authenticated: bool,
    username: String,
    roles: BTreeSet<Role>,
    otp_pending: bool,
}

impl Identity {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated principal. Staff/superuser principals get
    /// `{admin}`, everyone else `{user}`.
    #[must_use]
    pub fn authenticated(username: impl Into<String>, admin: bool) -> Self {
        let role = if admin { Role::Admin } else { Role::User };
        Self { authenticated: true, username: username.into(), roles: BTreeSet::from([role]), otp_pending: false }
    }

    /// Same principal with the second-factor flag replaced. No-op for anonymous.
    #[must_use]
    pub fn with_otp_pending(self, pending: bool) -> Self {
        Self { otp_pending: self.authenticated && pending, ..self }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    #[must_use]
    pub fn otp_pending(&self) -> bool {
        self.otp_pending
    }

    /// Normalize an identity-probe payload.
    ///
    /// Accepts `authenticated` or `is_authenticated`. Anything that is not an
    /// object with a `true` marker is anonymous, so `{}`, `{"is_authenticated":
    /// false}` and garbage all produce the same value.
    #[must_use]
    pub fn from_probe(payload: &Value) -> Self {
        let Some(fields) = payload.as_object() else {
            return Self::anonymous();
        };
        let marker = fields.get("authenticated").or_else(|| fields.get("is_authenticated"));
        if !matches!(marker, Some(Value::Bool(true))) {
            return Self::anonymous();
        }

        let flag = |key: &str| matches!(fields.get(key), Some(Value::Bool(true)));
        let username = fields.get("username").and_then(Value::as_str).unwrap_or_default().trim();
        let admin = flag("is_staff") || flag("is_superuser");
        Self::authenticated(username, admin).with_otp_pending(flag("otp_pending"))
    }

    /// Normalize a probe response body; non-JSON bodies are anonymous.
    #[must_use]
    pub fn from_body(body: &Body) -> Self {
        match body.as_json() {
            Some(payload) => Self::from_probe(payload),
            None => Self::anonymous(),
        }
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
