//! Navigation guard: a pure decision over a route intent and a session snapshot.
//!
//! DESIGN
//! ======
//! `decide` never performs I/O and holds no state. While the session is not
//! yet resolved it always answers `Defer`; the caller awaits
//! `SessionCache::resolve()` and asks again. Awaiting lives in the navigator.
//!
//! Checks run in a fixed order so an anonymous visitor is always sent to
//! login, never to a role-denied redirect:
//! defer, public, auth, admin-only, user-only, second-factor, allow.

use crate::identity::Identity;
use crate::session::SessionState;

// =============================================================================
// TYPES
// =============================================================================

/// Access requirements attached to a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    /// Only for visitors who are not logged in (e.g. the login page).
    pub public: bool,
    pub requires_auth: bool,
    pub admin_only: bool,
    /// Admins are sent to the landing page.
    pub user_only: bool,
    /// Identities with a pending second factor are sent to the OTP page.
    pub second_factor: bool,
}

impl RouteMeta {
    pub const OPEN: Self =
        Self { public: false, requires_auth: false, admin_only: false, user_only: false, second_factor: false };
    pub const PUBLIC: Self = Self { public: true, ..Self::OPEN };
    pub const AUTH: Self = Self { requires_auth: true, ..Self::OPEN };
    pub const ADMIN: Self = Self { requires_auth: true, admin_only: true, ..Self::OPEN };
    pub const USER: Self = Self { requires_auth: true, user_only: true, ..Self::OPEN };

    /// Same requirements plus the second-factor check.
    #[must_use]
    pub const fn with_second_factor(self) -> Self {
        Self { second_factor: true, ..self }
    }

    /// Role and second-factor checks only make sense for a logged-in identity.
    #[must_use]
    pub const fn needs_auth(&self) -> bool {
        self.requires_auth || self.admin_only || self.user_only || self.second_factor
    }
}

/// One pending navigation: target path (with query) and its requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteIntent {
    pub path: String,
    pub meta: RouteMeta,
}

impl RouteIntent {
    #[must_use]
    pub fn new(path: impl Into<String>, meta: RouteMeta) -> Self {
        Self { path: path.into(), meta }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectTo(String),
    /// Session not resolved yet; resolve and decide again.
    Defer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePaths {
    pub login: String,
    /// Default page for authenticated identities.
    pub landing: String,
    pub second_factor: String,
    /// Query parameter carrying the originally intended path.
    pub next_param: String,
}

impl Default for RoutePaths {
    fn default() -> Self {
        Self { login: "/login".into(), landing: "/menu".into(), second_factor: "/otp".into(), next_param: "next".into() }
    }
}

// =============================================================================
// DECISION
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guard {
    paths: RoutePaths,
}

impl Guard {
    #[must_use]
    pub fn new(paths: RoutePaths) -> Self {
        Self { paths }
    }

    #[must_use]
    pub fn paths(&self) -> &RoutePaths {
        &self.paths
    }

    #[must_use]
    pub fn decide(&self, intent: &RouteIntent, session: &SessionState) -> GuardDecision {
        let identity = match session {
            SessionState::Unknown | SessionState::Resolving => return GuardDecision::Defer,
            SessionState::Resolved(identity) => identity,
        };
        let decision = self.check(intent, identity);
        if let GuardDecision::RedirectTo(target) = &decision {
            tracing::debug!(path = %intent.path, target = %target, "guard redirect");
        }
        decision
    }

    fn check(&self, intent: &RouteIntent, identity: &Identity) -> GuardDecision {
        let meta = intent.meta;
        let authenticated = identity.is_authenticated();

        if meta.public && authenticated {
            return GuardDecision::RedirectTo(self.paths.landing.clone());
        }
        if meta.needs_auth() && !authenticated {
            return GuardDecision::RedirectTo(self.login_redirect(&intent.path));
        }
        if meta.admin_only && !identity.is_admin() {
            return GuardDecision::RedirectTo(self.paths.landing.clone());
        }
        if meta.user_only && identity.is_admin() {
            return GuardDecision::RedirectTo(self.paths.landing.clone());
        }
        if meta.second_factor && identity.otp_pending() {
            return GuardDecision::RedirectTo(self.resumable(&self.paths.second_factor, &intent.path));
        }
        GuardDecision::Allow
    }

    fn login_redirect(&self, intended: &str) -> String {
        self.resumable(&self.paths.login, intended)
    }

    fn resumable(&self, target: &str, intended: &str) -> String {
        format!("{target}?{}={}", self.paths.next_param, encode_next(intended))
    }
}

/// Decide with the default route paths.
#[must_use]
pub fn decide(intent: &RouteIntent, session: &SessionState) -> GuardDecision {
    Guard::default().decide(intent, session)
}

/// Percent-encode a path for the `next` parameter, keeping `/` readable.
fn encode_next(path: &str) -> String {
    urlencoding::encode(path).replace("%2F", "/")
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
