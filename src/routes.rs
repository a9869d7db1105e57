//! Application route table: which paths exist and what they require.

use std::collections::HashMap;

use crate::guard::{RouteIntent, RouteMeta};

/// Result of looking up a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Navigate to this path instead.
    Alias(String),
    Page(RouteIntent),
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    aliases: HashMap<String, String>,
    pages: HashMap<String, RouteMeta>,
    /// Requirements for paths not in the table.
    fallback: RouteMeta,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self { aliases: HashMap::new(), pages: HashMap::new(), fallback: RouteMeta::AUTH }
    }
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_alias(mut self, from: &str, to: &str) -> Self {
        self.aliases.insert(route_key(from), to.to_string());
        self
    }

    #[must_use]
    pub fn with_page(mut self, path: &str, meta: RouteMeta) -> Self {
        self.pages.insert(route_key(path), meta);
        self
    }

    /// The admin application's routes. Every page behind login also
    /// honors a pending second factor, except the OTP page itself.
    #[must_use]
    pub fn admin_app() -> Self {
        let admin = RouteMeta::ADMIN.with_second_factor();
        Self::new()
            .with_alias("/", "/menu")
            .with_page("/login", RouteMeta::PUBLIC)
            .with_page("/otp", RouteMeta::AUTH)
            .with_page("/menu", RouteMeta::AUTH.with_second_factor())
            .with_page("/categories", admin)
            .with_page("/customers", admin)
            .with_page("/orders", admin)
            .with_page("/order-items", admin)
            .with_page("/my-orders", RouteMeta::USER.with_second_factor())
    }

    /// Look up `path`, ignoring its query string and a trailing slash.
    /// Unknown paths require authentication.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Route {
        let (bare, query) = match path.split_once('?') {
            Some((bare, query)) => (bare, Some(query)),
            None => (path, None),
        };
        let key = route_key(bare);

        if let Some(target) = self.aliases.get(&key) {
            return Route::Alias(match query {
                Some(query) => format!("{target}?{query}"),
                None => target.clone(),
            });
        }
        let meta = self.pages.get(&key).copied().unwrap_or(self.fallback);
        Route::Page(RouteIntent::new(path, meta))
    }
}

fn route_key(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
