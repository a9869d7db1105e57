//! HTTP + cookie-store seam.
//!
//! DESIGN
//! ======
//! `HttpBackend` is the only place that touches the network or the cookie
//! jar. Everything above it (CSRF provisioning, response normalization,
//! session caching) is plain logic over `ApiRequest`/`RawResponse`, which
//! keeps it testable with a scripted backend.
//!
//! The cookie jar is read for exactly one thing: the CSRF token. Identity
//! never comes from cookies, only from the identity probe.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, REFERER};

use crate::config::ClientConfig;
use crate::error::{ConfigError, HttpError};

// =============================================================================
// WIRE TYPES
// =============================================================================

/// One outgoing request. `path` is API-relative (see [`ClientConfig::url`]).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), headers: Vec::new(), body: None }
    }

    /// Set a header, replacing any existing value (names compare case-insensitively).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// GET/HEAD/OPTIONS/TRACE never need the anti-forgery header.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        is_safe_method(&self.method)
    }
}

#[must_use]
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

/// A response as received, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`, empty when unknown.
    pub reason: String,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

// =============================================================================
// BACKEND TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait HttpBackend: Send + Sync {
    /// Send a request with credentials. Network failures map to
    /// [`HttpError::network`]; non-2xx statuses are returned as responses.
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, HttpError>;

    /// Current value of a cookie for the API origin.
    fn cookie(&self, name: &str) -> Option<String>;
}

// =============================================================================
// REQWEST BACKEND
// =============================================================================

/// `reqwest` client with an in-memory cookie jar, so every request carries
/// the session and CSRF cookies.
pub struct ReqwestBackend {
    http: reqwest::Client,
    jar: Arc<Jar>,
    config: ClientConfig,
    origin_url: reqwest::Url,
}

impl ReqwestBackend {
    /// # Errors
    ///
    /// Returns an error if the origin is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let origin_url =
            reqwest::Url::parse(&config.url("")).map_err(|_| ConfigError::InvalidOrigin(config.origin.clone()))?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, jar, config: config.clone(), origin_url })
    }
}

#[async_trait::async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, HttpError> {
        let url = self.config.url(&request.path);
        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.is_safe() {
            // Unsafe HTTPS requests need a same-origin Referer.
            builder = builder.header(REFERER, format!("{}/", self.config.origin));
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| HttpError::network(e.to_string()))?;
        let status = response.status();
        let content_type = header_string(response.headers(), CONTENT_TYPE);
        let content_disposition = header_string(response.headers(), CONTENT_DISPOSITION);
        let body = response.bytes().await.map_err(|e| HttpError::network(e.to_string()))?;

        tracing::debug!(method = %request.method, path = %request.path, status = status.as_u16(), "http response");
        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            content_disposition,
            body: body.to_vec(),
        })
    }

    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.origin_url)?;
        let Ok(raw) = header.to_str() else {
            return None;
        };
        find_cookie(raw, name)
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    let value = headers.get(name)?;
    match value.to_str() {
        Ok(s) => Some(s.to_string()),
        Err(_) => None,
    }
}

/// Find `name` in a `Cookie:` header value (`a=1; b=2`).
pub(crate) fn find_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
