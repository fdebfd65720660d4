//! Port interfaces for OAuth state storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relaygate_domain::{OAuthState, Result};

/// Key-value store for CSRF states.
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    /// Persist a freshly issued state.
    async fn insert(&self, state: OAuthState) -> Result<()>;

    /// Atomically mark `state` consumed if it exists, is unconsumed and has
    /// not expired at `now`. Returns the record on success and `None`
    /// otherwise. Concurrent calls for the same state yield exactly one
    /// `Some`.
    async fn consume(&self, state: &str, now: DateTime<Utc>) -> Result<Option<OAuthState>>;

    /// Delete consumed states and states expired at `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
