//! Port interfaces for webhook delivery audit and dedup

use async_trait::async_trait;
use relaygate_domain::{Result, WebhookDelivery};

/// Result of claiming a delivery for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryClaim {
    /// The caller owns this delivery and must publish it.
    Claimed { delivery_id: String, attempt: u32 },
    /// An earlier delivery with the same `(provider, external event id)`
    /// was already processed.
    Duplicate,
}

#[async_trait]
pub trait WebhookDeliveryRepository: Send + Sync {
    /// Atomically record `delivery` as processed.
    ///
    /// With an external event id, at most one caller ever gets `Claimed` for
    /// a given `(provider, event id)` while a processed row exists; an
    /// unprocessed row left by a failed attempt is re-claimed with its retry
    /// count bumped. Without an event id every call is `Claimed`.
    async fn claim(&self, delivery: &WebhookDelivery) -> Result<DeliveryClaim>;

    /// Store a delivery that was rejected before it could be claimed.
    async fn record_failure(&self, delivery: &WebhookDelivery) -> Result<()>;

    /// Flip a claimed delivery back to unprocessed after a publish failure.
    async fn mark_failed(&self, delivery_id: &str, error_message: &str) -> Result<()>;
}
