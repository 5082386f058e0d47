//! Session/profile synchronizer.
//!
//! [`SessionManager`] owns the signed-in user. It keeps three sources
//! consistent: the in-memory session with its local cache ([`tiers`]), the
//! auth provider's remote session and the remote profile record.

pub mod cache;
pub mod manager;
pub mod model;
pub mod tiers;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::PortalError;

pub use cache::FileSessionCache;
pub use manager::SessionManager;
pub use model::{Role, UserSession};

/// Remote profile record, keyed by e-mail.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Empty map when the user has no stored profile.
    async fn fetch_profile(&self, email: &str) -> Result<Map<String, Value>, PortalError>;

    /// Merges `details` into the stored profile.
    async fn upsert_profile(&self, email: &str, details: &Map<String, Value>)
        -> Result<(), PortalError>;
}
