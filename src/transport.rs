//! Credentialed HTTP transport with CSRF attachment and response normalization.
//!
//! DESIGN
//! ======
//! Safe methods go straight to the backend. Unsafe methods take the CSRF
//! path: attach the token (provisioning lazily), send, and on a CSRF
//! rejection refresh the token and retry exactly once.
//!
//! Responses are normalized into `Body` or `HttpError`. Non-JSON payloads
//! (exports) pass through untouched as `Body::Binary`.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{ApiRequest, HttpBackend, RawResponse};
use crate::config::ClientConfig;
use crate::csrf::CsrfProvisioner;
use crate::error::HttpError;

// =============================================================================
// BODY
// =============================================================================

/// A file-like payload returned untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBody {
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub bytes: Vec<u8>,
}

/// Normalized 2xx response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Binary(BinaryBody),
}

impl Body {
    /// JSON value of the body; `Null` for empty or binary bodies.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Empty | Self::Binary(_) => Value::Null,
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Empty | Self::Binary(_) => None,
        }
    }

    /// Deserialize a JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not JSON or does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        match self {
            Self::Json(value) => serde_json::from_value(value)
                .map_err(|e| HttpError::new(200, format!("unexpected response shape: {e}"))),
            Self::Empty => Err(HttpError::new(204, "expected a JSON body, got none")),
            Self::Binary(_) => Err(HttpError::new(200, "expected a JSON body, got a file")),
        }
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

pub struct Transport {
    backend: Arc<dyn HttpBackend>,
    csrf: CsrfProvisioner,
}

impl Transport {
    #[must_use]
    pub fn new(backend: Arc<dyn HttpBackend>, config: &ClientConfig) -> Self {
        let csrf = CsrfProvisioner::new(Arc::clone(&backend), config);
        Self { backend, csrf }
    }

    #[must_use]
    pub fn csrf(&self) -> &CsrfProvisioner {
        &self.csrf
    }

    /// # Errors
    ///
    /// Returns [`HttpError`] for network failures and non-2xx responses.
    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Body, HttpError> {
        self.request(Method::GET, path, None, options).await
    }

    /// POST a JSON body (`{}` when `body` is `None`).
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for network failures and non-2xx responses.
    pub async fn post(&self, path: &str, body: Option<Value>, options: RequestOptions) -> Result<Body, HttpError> {
        let body = body.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        self.request(Method::POST, path, Some(body), options).await
    }

    /// PATCH a JSON body (`{}` when `body` is `None`).
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] for network failures and non-2xx responses.
    pub async fn patch(&self, path: &str, body: Option<Value>, options: RequestOptions) -> Result<Body, HttpError> {
        let body = body.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        self.request(Method::PATCH, path, Some(body), options).await
    }

    /// # Errors
    ///
    /// Returns [`HttpError`] for network failures and non-2xx responses.
    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Body, HttpError> {
        self.request(Method::DELETE, path, None, options).await
    }

    /// # Errors
    ///
    /// Returns [`HttpError`] for network failures and non-2xx responses.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Body, HttpError> {
        let mut request = ApiRequest::new(method, path);
        request.query = options.query;
        request.body = body;

        if request.is_safe() {
            return self.send(request).await;
        }
        self.send_with_csrf(request).await
    }

    async fn send_with_csrf(&self, mut request: ApiRequest) -> Result<Body, HttpError> {
        self.csrf.attach(&mut request).await;
        match self.send(request.clone()).await {
            Err(error) if error.is_csrf_rejection() => {
                tracing::info!(path = %request.path, detail = %error.detail, "csrf token rejected; refreshing once");
                if let Some(token) = self.csrf.refresh().await {
                    request.set_header(self.csrf.header_name(), token);
                }
                self.send(request).await
            }
            other => other,
        }
    }

    async fn send(&self, request: ApiRequest) -> Result<Body, HttpError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let raw = self.backend.send(request).await?;
        let result = normalize(raw);
        if let Err(error) = &result {
            tracing::debug!(%method, %path, status = error.status, detail = %error.detail, "request failed");
        }
        result
    }
}

// =============================================================================
// NORMALIZATION
// =============================================================================

pub(crate) fn normalize(raw: RawResponse) -> Result<Body, HttpError> {
    if !(200..300).contains(&raw.status) {
        let detail = error_detail(&raw);
        return Err(HttpError::new(raw.status, detail));
    }
    if raw.body.is_empty() {
        return Ok(Body::Empty);
    }
    if is_json(raw.content_type.as_deref()) {
        return serde_json::from_slice(&raw.body)
            .map(Body::Json)
            .map_err(|e| HttpError::new(raw.status, format!("invalid JSON body: {e}")));
    }
    Ok(Body::Binary(BinaryBody {
        content_type: raw.content_type,
        content_disposition: raw.content_disposition,
        bytes: raw.body,
    }))
}

fn is_json(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// `detail`, then `message`, then `error`, then the reason phrase.
pub(crate) fn error_detail(raw: &RawResponse) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&raw.body) {
        for key in ["detail", "message", "error"] {
            if let Some(Value::String(text)) = map.get(key) {
                return text.clone();
            }
        }
    }
    if raw.reason.is_empty() { format!("HTTP {}", raw.status) } else { raw.reason.clone() }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
