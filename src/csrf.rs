//! CSRF token provisioning and attachment.
//!
//! DESIGN
//! ======
//! The token lives in the cookie store; the provisioner only knows how to
//! make the backend set it (GET on the seed endpoint) and how to read it
//! back. Seeding is single-flight: a burst of unsafe requests issued while
//! no token exists produces one seed request.
//!
//! ERROR HANDLING
//! ==============
//! A failed seed is logged and leaves the token absent. The unsafe request
//! that needed it then fails on its own with a 403, which the transport
//! answers with one refresh-and-retry.

use std::sync::{Arc, Mutex};

use reqwest::Method;

use crate::backend::{ApiRequest, HttpBackend};
use crate::config::ClientConfig;
use crate::error::{HttpError, ProvisionError};
use crate::flight::{Flight, SingleFlight, lock};

pub struct CsrfProvisioner {
    backend: Arc<dyn HttpBackend>,
    seed_path: String,
    cookie_name: String,
    header_name: String,
    /// Token echoed in the seed response body, for cookie stores we cannot read.
    remembered: Arc<Mutex<Option<String>>>,
    flight: SingleFlight<Option<String>>,
}

impl CsrfProvisioner {
    #[must_use]
    pub fn new(backend: Arc<dyn HttpBackend>, config: &ClientConfig) -> Self {
        Self {
            backend,
            seed_path: config.endpoints.csrf.clone(),
            cookie_name: config.csrf_cookie.clone(),
            header_name: config.csrf_header.clone(),
            remembered: Arc::new(Mutex::new(None)),
            flight: SingleFlight::new(),
        }
    }

    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Current token, without any network call.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.backend.cookie(&self.cookie_name).or_else(|| lock(&self.remembered).clone())
    }

    /// Return the token, seeding it first if absent. Concurrent callers share
    /// one seed request. `None` means seeding failed; callers carry on.
    pub async fn ensure_token(&self) -> Option<String> {
        if let Some(token) = self.token() {
            return Some(token);
        }
        self.seed().await
    }

    /// Drop the remembered token and seed a fresh one.
    pub async fn refresh(&self) -> Option<String> {
        self.forget();
        self.seed().await
    }

    /// Drop the remembered token. The cookie itself is owned by the backend.
    pub fn forget(&self) {
        *lock(&self.remembered) = None;
    }

    /// Attach the token header to an unsafe request, provisioning lazily.
    /// Returns whether a token was attached.
    pub async fn attach(&self, request: &mut ApiRequest) -> bool {
        if request.is_safe() {
            return false;
        }
        match self.ensure_token().await {
            Some(token) => {
                request.set_header(&self.header_name, token);
                true
            }
            None => {
                tracing::debug!(path = %request.path, "sending unsafe request without csrf token");
                false
            }
        }
    }

    fn seed(&self) -> Flight<Option<String>> {
        self.flight.run(|| {
            let backend = Arc::clone(&self.backend);
            let remembered = Arc::clone(&self.remembered);
            let seed_path = self.seed_path.clone();
            let cookie_name = self.cookie_name.clone();
            async move {
                match seed_token(backend.as_ref(), &seed_path, &cookie_name).await {
                    Ok(token) => {
                        if let Some(echoed) = &token {
                            *lock(&remembered) = Some(echoed.clone());
                        }
                        tracing::debug!(has_token = token.is_some(), "csrf token seeded");
                        token
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "csrf seed failed; continuing without token");
                        None
                    }
                }
            }
        })
    }
}

async fn seed_token(
    backend: &dyn HttpBackend,
    seed_path: &str,
    cookie_name: &str,
) -> Result<Option<String>, ProvisionError> {
    let response = backend
        .send(ApiRequest::new(Method::GET, seed_path))
        .await
        .map_err(ProvisionError)?;
    if !(200..300).contains(&response.status) {
        return Err(ProvisionError(HttpError::new(response.status, response.reason)));
    }

    let echoed = match serde_json::from_slice::<serde_json::Value>(&response.body) {
        Ok(body) => body.get("csrfToken").and_then(serde_json::Value::as_str).map(str::to_string),
        Err(_) => None,
    };
    Ok(backend.cookie(cookie_name).or(echoed))
}

#[cfg(test)]
#[path = "csrf_test.rs"]
mod tests;
