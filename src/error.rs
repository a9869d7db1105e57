//! Error types shared across the session subsystem.
//!
//! DESIGN
//! ======
//! `HttpError` is the one error every HTTP-facing operation produces. The
//! narrower enums (`AuthError`, `TwoFactorError`) wrap it so callers can
//! match on the user-facing case without losing the transport detail.

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for logs and CLI output.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// HTTP
// =============================================================================

/// A non-2xx response, or a network failure when `status == 0`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("HTTP {status}: {detail}")]
pub struct HttpError {
    pub status: u16,
    pub detail: String,
}

impl HttpError {
    #[must_use]
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }

    /// Network-level failure: no HTTP status was received.
    #[must_use]
    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(0, detail)
    }

    #[must_use]
    pub fn is_network(&self) -> bool {
        self.status == 0
    }

    /// 401/403: the cached identity may be stale.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, 401 | 403)
    }

    /// A 403 that the backend attributes to the anti-forgery token.
    #[must_use]
    pub fn is_csrf_rejection(&self) -> bool {
        self.status == 403 && self.detail.to_ascii_lowercase().contains("csrf")
    }
}

impl ErrorCode for HttpError {
    fn error_code(&self) -> &'static str {
        match self.status {
            0 => "E_NETWORK",
            400 => "E_BAD_REQUEST",
            401 => "E_UNAUTHORIZED",
            403 => "E_FORBIDDEN",
            404 => "E_NOT_FOUND",
            500..=599 => "E_SERVER",
            _ => "E_HTTP",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self.status, 0 | 429 | 500..=599)
    }
}

// =============================================================================
// CSRF
// =============================================================================

/// CSRF seeding failed. Logged by the provisioner, never returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("csrf seed failed: {0}")]
pub struct ProvisionError(pub HttpError);

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The backend rejected the username/password pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Login was accepted but the identity probe still reports anonymous.
    #[error("login accepted but no session was established")]
    SessionNotEstablished,

    /// Network or server failure during login/logout.
    #[error("auth request failed: {0}")]
    Transport(HttpError),
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::SessionNotEstablished => "E_SESSION_NOT_ESTABLISHED",
            Self::Transport(_) => "E_AUTH_TRANSPORT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.retryable())
    }
}

// =============================================================================
// TWO-FACTOR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TwoFactorError {
    /// Code is malformed or the backend did not accept it.
    #[error("invalid one-time code")]
    InvalidCode,

    #[error("two-factor request failed: {0}")]
    Http(#[from] HttpError),
}

impl ErrorCode for TwoFactorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCode => "E_INVALID_OTP",
            Self::Http(e) => e.error_code(),
        }
    }
}

// =============================================================================
// NAVIGATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// Aliases and guard redirects did not settle on a page.
    #[error("too many redirects navigating to {path} (last: {last})")]
    RedirectLoop { path: String, last: String },
}

impl ErrorCode for NavigationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RedirectLoop { .. } => "E_REDIRECT_LOOP",
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },

    #[error("origin must start with http:// or https://: {0}")]
    InvalidOrigin(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "E_CONFIG_PARSE",
            Self::InvalidOrigin(_) => "E_CONFIG_ORIGIN",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
