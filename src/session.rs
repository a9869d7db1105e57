//! Session cache — the single authoritative identity record.
//!
//! DESIGN
//! ======
//! State moves `Unknown -> Resolving -> Resolved(Identity)`. Entering
//! `Resolving` launches exactly one identity probe; every concurrent
//! `resolve()` joins that flight instead of probing again.
//!
//! Every write bumps a generation counter. A probe commits its result only
//! if its generation is still current, so `invalidate()`, `logout()` and
//! a failed `login()` always win over an older probe still in flight.
//!
//! ERROR HANDLING
//! ==============
//! - Probe: fail-closed. Any error or malformed body resolves to anonymous.
//!   In two-factor mode a failed OTP status lookup marks the second factor
//!   pending.
//! - Logout: fail-open. The anonymous identity is written before and after
//!   the network call; a failed call is reported but changes nothing.
//! - Login: failures leave `Resolved(anonymous)` so the guard does not
//!   re-probe on the next navigation.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::flight::{Flight, launch, lock};
use crate::identity::Identity;
use crate::transport::{Body, RequestOptions, Transport};
use crate::two_factor::OtpStatus;

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No probe has completed since start or the last invalidation.
    Unknown,
    /// A probe is in flight.
    Resolving,
    Resolved(Identity),
}

impl SessionState {
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Resolved(identity) => Some(identity),
            Self::Unknown | Self::Resolving => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

enum Phase {
    Unknown,
    Resolving { generation: u64, flight: Flight<Identity> },
    Resolved(Identity),
}

struct Inner {
    generation: u64,
    phase: Phase,
}

impl Inner {
    fn snapshot(&self) -> SessionState {
        match &self.phase {
            Phase::Unknown => SessionState::Unknown,
            Phase::Resolving { .. } => SessionState::Resolving,
            Phase::Resolved(identity) => SessionState::Resolved(identity.clone()),
        }
    }

    fn bump(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    fn settle(&mut self, identity: Identity) {
        self.bump();
        self.phase = Phase::Resolved(identity);
    }

    /// Store a probe result if `generation` is still the probe in flight.
    fn commit(&mut self, generation: u64, identity: Identity) {
        let current = matches!(&self.phase, Phase::Resolving { generation: g, .. } if *g == generation);
        if !current {
            if generation != self.generation {
                tracing::debug!(generation, "discarding superseded probe result");
            }
            return;
        }
        tracing::debug!(authenticated = identity.is_authenticated(), username = identity.username(), "session resolved");
        self.phase = Phase::Resolved(identity);
    }
}

#[derive(Clone)]
struct ProbePlan {
    identity_path: String,
    otp_status_path: String,
    two_factor: bool,
}

// =============================================================================
// SESSION CACHE
// =============================================================================

pub struct SessionCache {
    transport: Arc<Transport>,
    probe: ProbePlan,
    login_path: String,
    logout_path: String,
    inner: Arc<Mutex<Inner>>,
}

impl SessionCache {
    #[must_use]
    pub fn new(transport: Arc<Transport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            probe: ProbePlan {
                identity_path: config.endpoints.identity.clone(),
                otp_status_path: config.endpoints.otp_status.clone(),
                two_factor: config.two_factor,
            },
            login_path: config.endpoints.login.clone(),
            logout_path: config.endpoints.logout.clone(),
            inner: Arc::new(Mutex::new(Inner { generation: 0, phase: Phase::Unknown })),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        lock(&self.inner).snapshot()
    }

    /// The cached identity, if resolved. Never triggers a probe.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state().identity().cloned()
    }

    /// Resolve the session, probing at most once for all concurrent callers.
    ///
    /// Returns immediately when already resolved. If the state is
    /// invalidated while waiting, the newer truth is awaited instead of
    /// returning the superseded result.
    pub async fn resolve(&self) -> SessionState {
        loop {
            let (generation, flight) = {
                let mut inner = lock(&self.inner);
                let joined = match &inner.phase {
                    Phase::Resolved(identity) => return SessionState::Resolved(identity.clone()),
                    Phase::Resolving { generation, flight } => Some((*generation, flight.clone())),
                    Phase::Unknown => None,
                };
                match joined {
                    Some(joined) => joined,
                    None => self.start_probe(&mut inner),
                }
            };
            let identity = flight.await;
            lock(&self.inner).commit(generation, identity);
        }
    }

    /// Forget the cached identity; the next `resolve()` probes again.
    pub fn invalidate(&self) {
        let mut inner = lock(&self.inner);
        inner.bump();
        inner.phase = Phase::Unknown;
        tracing::debug!("session invalidated");
    }

    /// Log in, then re-probe to learn the resulting identity.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] on 400/401 or an `ok: false` reply.
    /// - [`AuthError::Transport`] on network or server failure.
    /// - [`AuthError::SessionNotEstablished`] if the probe still reports anonymous.
    ///
    /// In every error case the session is left `Resolved(anonymous)`.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        self.transport.csrf().ensure_token().await;
        let credentials = serde_json::json!({ "username": username.trim(), "password": password });
        match self.transport.post(&self.login_path, Some(credentials), RequestOptions::default()).await {
            Ok(body) if !login_rejected(&body) => {}
            Ok(_) => return Err(self.fail_login(AuthError::InvalidCredentials)),
            Err(error) if matches!(error.status, 400 | 401) => {
                return Err(self.fail_login(AuthError::InvalidCredentials));
            }
            Err(error) => return Err(self.fail_login(AuthError::Transport(error))),
        }

        // The backend rotates the token with the session.
        self.transport.csrf().forget();
        self.invalidate();
        match self.resolve().await {
            SessionState::Resolved(identity) if identity.is_authenticated() => {
                tracing::info!(username = identity.username(), admin = identity.is_admin(), "logged in");
                Ok(identity)
            }
            _ => {
                tracing::warn!(username = username.trim(), "login accepted but probe reports anonymous");
                Err(AuthError::SessionNotEstablished)
            }
        }
    }

    /// Log out. Locally effective even when the request fails.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Transport`] if the logout request failed; the
    /// session is anonymous regardless.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.settle(Identity::anonymous());
        self.transport.csrf().ensure_token().await;
        let outcome = self.transport.post(&self.logout_path, None, RequestOptions::default()).await;
        self.settle(Identity::anonymous());
        self.transport.csrf().forget();

        match outcome {
            Ok(_) => {
                tracing::info!("logged out");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(status = error.status, detail = %error.detail, "logout request failed; session cleared locally");
                Err(AuthError::Transport(error))
            }
        }
    }

    fn settle(&self, identity: Identity) {
        lock(&self.inner).settle(identity);
    }

    fn fail_login(&self, error: AuthError) -> AuthError {
        tracing::warn!(error = %error, "login failed");
        self.settle(Identity::anonymous());
        error
    }

    fn start_probe(&self, inner: &mut Inner) -> (u64, Flight<Identity>) {
        let generation = inner.bump();
        let transport = Arc::clone(&self.transport);
        let plan = self.probe.clone();
        let owner = Arc::clone(&self.inner);
        let flight = launch(async move {
            let identity = probe_identity(&transport, &plan).await;
            lock(&owner).commit(generation, identity.clone());
            identity
        });
        inner.phase = Phase::Resolving { generation, flight: flight.clone() };
        (generation, flight)
    }
}

/// One identity probe, plus the OTP status lookup in two-factor mode.
async fn probe_identity(transport: &Transport, plan: &ProbePlan) -> Identity {
    tracing::debug!(path = %plan.identity_path, "probing identity");
    let identity = match transport.get(&plan.identity_path, RequestOptions::default()).await {
        Ok(body) => Identity::from_body(&body),
        Err(error) => {
            tracing::warn!(status = error.status, detail = %error.detail, "identity probe failed; treating as anonymous");
            Identity::anonymous()
        }
    };
    if !(plan.two_factor && identity.is_authenticated()) {
        return identity;
    }

    let status = transport
        .get(&plan.otp_status_path, RequestOptions::default())
        .await
        .and_then(Body::decode::<OtpStatus>);
    match status {
        Ok(status) => {
            let pending = status.is_pending();
            identity.with_otp_pending(pending)
        }
        Err(error) => {
            tracing::warn!(status = error.status, detail = %error.detail, "otp status lookup failed; second factor pending");
            identity.with_otp_pending(true)
        }
    }
}

/// Some backends answer bad credentials with `200 {"ok": false}`.
fn login_rejected(body: &Body) -> bool {
    let Some(Value::Object(fields)) = body.as_json() else {
        return false;
    };
    ["ok", "success"].iter().any(|key| matches!(fields.get(*key), Some(Value::Bool(false))))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
