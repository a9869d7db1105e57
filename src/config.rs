//! Client configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! One typed `ClientConfig` is built up front and shared by every component.
//! Endpoint paths are relative to the API base so deployments that mount the
//! backend under a different prefix only change `ADMIN_API_BASE`.

use crate::error::ConfigError;

pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";
pub const DEFAULT_API_BASE: &str = "/api/";
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFToken";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Backend endpoint paths, relative to the API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub csrf: String,
    pub login: String,
    pub logout: String,
    pub identity: String,
    pub otp_status: String,
    pub otp_login: String,
    pub otp_secret: String,
    pub otp_reset: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            csrf: "csrf/".into(),
            login: "auth/login/".into(),
            logout: "auth/logout/".into(),
            identity: "auth/me/".into(),
            otp_status: "2fa/otp-status/".into(),
            otp_login: "2fa/otp-login/".into(),
            otp_secret: "2fa/otp-secret/".into(),
            otp_reset: "2fa/otp-reset/".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme and host, without a trailing slash.
    pub origin: String,
    /// API base path, always starting and ending with `/`.
    pub api_base: String,
    pub csrf_cookie: String,
    pub csrf_header: String,
    /// Consult the OTP status endpoint after every authenticated probe.
    pub two_factor: bool,
    pub timeouts: Timeouts,
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.into(),
            api_base: DEFAULT_API_BASE.into(),
            csrf_cookie: DEFAULT_CSRF_COOKIE.into(),
            csrf_header: DEFAULT_CSRF_HEADER.into(),
            two_factor: false,
            timeouts: Timeouts::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `ADMIN_ORIGIN`: default `http://127.0.0.1:8000`
    /// - `ADMIN_API_BASE`: default `/api/`
    /// - `ADMIN_CSRF_COOKIE`: default `csrftoken`
    /// - `ADMIN_CSRF_HEADER`: default `X-CSRFToken`
    /// - `ADMIN_TWO_FACTOR`: `1|true|yes|on` or `0|false|no|off`, default off
    /// - `ADMIN_REQUEST_TIMEOUT_SECS`: default 30
    /// - `ADMIN_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a present variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(origin) = env_string("ADMIN_ORIGIN") {
            config.origin = normalize_origin(&origin)?;
        }
        if let Some(base) = env_string("ADMIN_API_BASE") {
            config.api_base = normalize_api_base(&base);
        }
        if let Some(cookie) = env_string("ADMIN_CSRF_COOKIE") {
            config.csrf_cookie = cookie;
        }
        if let Some(header) = env_string("ADMIN_CSRF_HEADER") {
            config.csrf_header = header;
        }
        if let Some(raw) = env_string("ADMIN_TWO_FACTOR") {
            config.two_factor =
                parse_bool(&raw).ok_or_else(|| ConfigError::Invalid { var: "ADMIN_TWO_FACTOR", value: raw.clone() })?;
        }
        config.timeouts = Timeouts {
            request_secs: env_parse_u64("ADMIN_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_u64("ADMIN_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        Ok(config)
    }

    /// Replace the origin, validating its scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not an `http(s)://` URL.
    pub fn with_origin(mut self, origin: &str) -> Result<Self, ConfigError> {
        self.origin = normalize_origin(origin)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = normalize_api_base(base);
        self
    }

    /// Absolute URL for an API-relative path. Paths already starting with `/`
    /// are taken as origin-absolute.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.origin)
        } else {
            format!("{}{}{path}", self.origin, self.api_base)
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn env_parse_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env_string(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid { var: key, value: raw }),
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn normalize_origin(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidOrigin(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_api_base(raw: &str) -> String {
    let inner = raw.trim().trim_matches('/');
    if inner.is_empty() { "/".to_string() } else { format!("/{inner}/") }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
