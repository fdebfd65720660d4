//! Event bus port

use async_trait::async_trait;
use relaygate_domain::{DomainEvent, Result};

/// Outbound side of the domain event bus.
///
/// Delivery guarantees belong to the bus. Callers treat publishing as
/// fire-and-forget and only log failures.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent) -> Result<()>;
}
