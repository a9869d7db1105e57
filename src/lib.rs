//! Session and authorization client for the cafe admin backend.
//!
//! DESIGN
//! ======
//! Four pieces, bottom-up:
//!
//! - `csrf` provisions the anti-forgery token (single-flight seeding).
//! - `transport` sends credentialed requests, attaches the token to unsafe
//!   methods and retries once after a CSRF rejection.
//! - `session` owns the one authoritative identity record and coalesces
//!   concurrent probes.
//! - `guard` is a pure `decide(intent, state)`; `navigator` does the
//!   awaiting when the guard defers.
//!
//! `AdminClient` wires them together; `resources`, `export` and
//! `two_factor` are the collaborators that call the backend through it.

pub mod backend;
pub mod client;
pub mod config;
pub mod csrf;
pub mod error;
pub mod export;
pub mod flight;
pub mod guard;
pub mod identity;
pub mod navigator;
pub mod resources;
pub mod routes;
pub mod session;
pub mod transport;
pub mod two_factor;

#[cfg(test)]
#[path = "mock_backend_test.rs"]
pub(crate) mod mock_backend;

pub use client::AdminClient;
pub use config::ClientConfig;
pub use error::{AuthError, ConfigError, ErrorCode, HttpError, NavigationError, TwoFactorError};
pub use guard::{GuardDecision, RouteIntent, RouteMeta, decide};
pub use identity::{Identity, Role};
pub use session::{SessionCache, SessionState};
pub use transport::{Body, RequestOptions};
