//! `AdminClient`: one backend, one CSRF provisioner, one session cache.
//!
//! DESIGN
//! ======
//! The client is the process-wide owner of session state. Collaborators
//! (resources, export, two-factor) call through it rather than the raw
//! transport so that any 401/403 invalidates the cached identity and the
//! next guard check re-probes.

use std::sync::Arc;

use serde_json::Value;

use crate::backend::{HttpBackend, ReqwestBackend};
use crate::config::ClientConfig;
use crate::error::{AuthError, ConfigError, HttpError, NavigationError};
use crate::guard::{Guard, RoutePaths};
use crate::identity::Identity;
use crate::navigator::{Navigation, Navigator};
use crate::routes::RouteTable;
use crate::session::{SessionCache, SessionState};
use crate::transport::{Body, RequestOptions, Transport};

pub struct AdminClient {
    config: ClientConfig,
    transport: Arc<Transport>,
    session: Arc<SessionCache>,
    navigator: Navigator,
}

impl AdminClient {
    /// Client over a real HTTP backend with its own cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let backend = ReqwestBackend::new(&config)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    #[must_use]
    pub fn with_backend(config: ClientConfig, backend: Arc<dyn HttpBackend>) -> Self {
        Self::with_routes(config, backend, RouteTable::admin_app(), RoutePaths::default())
    }

    #[must_use]
    pub fn with_routes(
        config: ClientConfig,
        backend: Arc<dyn HttpBackend>,
        table: RouteTable,
        paths: RoutePaths,
    ) -> Self {
        let transport = Arc::new(Transport::new(backend, &config));
        let session = Arc::new(SessionCache::new(Arc::clone(&transport), &config));
        let navigator = Navigator::new(Arc::clone(&session), table, Guard::new(paths));
        Self { config, transport, session, navigator }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    pub async fn resolve(&self) -> SessionState {
        self.session.resolve().await
    }

    /// # Errors
    ///
    /// See [`SessionCache::login`].
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        self.session.login(username, password).await
    }

    /// # Errors
    ///
    /// See [`SessionCache::logout`].
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.session.logout().await
    }

    /// # Errors
    ///
    /// See [`Navigator::navigate`].
    pub async fn navigate(&self, path: &str) -> Result<Navigation, NavigationError> {
        self.navigator.navigate(path).await
    }

    // =========================================================================
    // REQUESTS
    // =========================================================================

    /// # Errors
    ///
    /// Returns [`HttpError`] for network failures and non-2xx responses.
    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Body, HttpError> {
        self.observe(self.transport.get(path, options).await)
    }

    /// # Errors
    ///
    /// Returns [`HttpError`] for network failures and non-2xx responses.
    pub async fn post(&self, path: &str, body: Option<Value>, options: RequestOptions) -> Result<Body, HttpError> {
        self.observe(self.transport.post(path, body, options).await)
    }

    /// # Errors
    ///
    /// Returns [`HttpError`] for network failures and non-2xx responses.
    pub async fn patch(&self, path: &str, body: Option<Value>, options: RequestOptions) -> Result<Body, HttpError> {
        self.observe(self.transport.patch(path, body, options).await)
    }

    /// # Errors
    ///
    /// Returns [`HttpError`] for network failures and non-2xx responses.
    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Body, HttpError> {
        self.observe(self.transport.delete(path, options).await)
    }

    /// A 401/403 means the cached identity may be stale.
    fn observe(&self, result: Result<Body, HttpError>) -> Result<Body, HttpError> {
        if let Some(error) = result.as_ref().err().filter(|error| error.is_auth_failure()) {
            tracing::info!(status = error.status, detail = %error.detail, "authorization failure; invalidating session");
            self.session.invalidate();
        }
        result
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
