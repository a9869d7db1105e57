//! Imperative half of the guard: resolve the session when the guard defers,
//! then follow aliases and redirects until a page is allowed.

use std::sync::Arc;

use crate::error::NavigationError;
use crate::guard::{Guard, GuardDecision};
use crate::routes::{Route, RouteTable};
use crate::session::SessionCache;

/// Aliases plus guard redirects allowed before giving up.
pub const MAX_HOPS: usize = 8;

/// Where a navigation settled and the redirects taken on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    pub redirects: Vec<String>,
}

pub struct Navigator {
    session: Arc<SessionCache>,
    table: RouteTable,
    guard: Guard,
}

impl Navigator {
    #[must_use]
    pub fn new(session: Arc<SessionCache>, table: RouteTable, guard: Guard) -> Self {
        Self { session, table, guard }
    }

    #[must_use]
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Navigate to `path`, awaiting session resolution whenever the guard defers.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::RedirectLoop`] after [`MAX_HOPS`] hops.
    pub async fn navigate(&self, path: &str) -> Result<Navigation, NavigationError> {
        let mut current = path.to_string();
        let mut redirects = Vec::new();

        for _ in 0..=MAX_HOPS {
            let intent = match self.table.resolve(&current) {
                Route::Alias(target) => {
                    redirects.push(target.clone());
                    current = target;
                    continue;
                }
                Route::Page(intent) => intent,
            };

            let mut decision = self.guard.decide(&intent, &self.session.state());
            if decision == GuardDecision::Defer {
                let state = self.session.resolve().await;
                decision = self.guard.decide(&intent, &state);
            }

            match decision {
                GuardDecision::Allow => {
                    tracing::debug!(path = %current, hops = redirects.len(), "navigation allowed");
                    return Ok(Navigation { path: current, redirects });
                }
                GuardDecision::RedirectTo(target) => {
                    redirects.push(target.clone());
                    current = target;
                }
                // `resolve()` only returns `Resolved`, so a re-decision never defers.
                GuardDecision::Defer => {}
            }
        }

        tracing::warn!(path, last = %current, "redirect loop");
        Err(NavigationError::RedirectLoop { path: path.to_string(), last: current })
    }
}

#[cfg(test)]
#[path = "navigator_test.rs"]
mod tests;
