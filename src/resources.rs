//! CRUD calls for the admin application's entities.
//!
//! Thin wrappers over the client: every call goes through `AdminClient`, so
//! a 401/403 from any of them invalidates the session cache.

use std::fmt;

use serde_json::Value;

use crate::client::AdminClient;
use crate::error::HttpError;
use crate::transport::{Body, RequestOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Categories,
    Menu,
    Customers,
    Orders,
    OrderItems,
}

impl Resource {
    pub const ALL: [Self; 5] = [Self::Categories, Self::Menu, Self::Customers, Self::Orders, Self::OrderItems];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Menu => "menu",
            Self::Customers => "customers",
            Self::Orders => "orders",
            Self::OrderItems => "order-items",
        }
    }

    /// Collection path relative to the API base, e.g. `order-items/`.
    #[must_use]
    pub fn path(self) -> String {
        format!("{}/", self.name())
    }

    #[must_use]
    pub fn item_path(self, id: &str) -> String {
        format!("{}/{}/", self.name(), id.trim_matches('/'))
    }

    /// Accepts the collection name with `-` or `_`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().trim_matches('/').replace('_', "-").to_ascii_lowercase();
        Self::ALL.into_iter().find(|resource| resource.name() == wanted)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// List rows; `options` carries search/filter/pagination params.
///
/// # Errors
///
/// Returns [`HttpError`] for network failures and non-2xx responses.
pub async fn list(client: &AdminClient, resource: Resource, options: RequestOptions) -> Result<Value, HttpError> {
    json(client.get(&resource.path(), options).await?)
}

/// # Errors
///
/// Returns [`HttpError`] for network failures and non-2xx responses.
pub async fn get(client: &AdminClient, resource: Resource, id: &str) -> Result<Value, HttpError> {
    json(client.get(&resource.item_path(id), RequestOptions::default()).await?)
}

/// # Errors
///
/// Returns [`HttpError`] for network failures and non-2xx responses.
pub async fn create(client: &AdminClient, resource: Resource, body: Value) -> Result<Value, HttpError> {
    json(client.post(&resource.path(), Some(body), RequestOptions::default()).await?)
}

/// Partial update (PATCH).
///
/// # Errors
///
/// Returns [`HttpError`] for network failures and non-2xx responses.
pub async fn update(client: &AdminClient, resource: Resource, id: &str, body: Value) -> Result<Value, HttpError> {
    json(client.patch(&resource.item_path(id), Some(body), RequestOptions::default()).await?)
}

/// # Errors
///
/// Returns [`HttpError`] for network failures and non-2xx responses.
pub async fn delete(client: &AdminClient, resource: Resource, id: &str) -> Result<(), HttpError> {
    client.delete(&resource.item_path(id), RequestOptions::default()).await?;
    Ok(())
}

/// Aggregate counters served at `<resource>/stats/`.
///
/// # Errors
///
/// Returns [`HttpError`] for network failures and non-2xx responses.
pub async fn stats(client: &AdminClient, resource: Resource) -> Result<Value, HttpError> {
    json(client.get(&format!("{}stats/", resource.path()), RequestOptions::default()).await?)
}

fn json(body: Body) -> Result<Value, HttpError> {
    match body {
        Body::Json(value) => Ok(value),
        Body::Empty => Ok(Value::Null),
        Body::Binary(_) => Err(HttpError::new(200, "expected a JSON body, got a file")),
    }
}

#[cfg(test)]
#[path = "resources_test.rs"]
mod tests;
