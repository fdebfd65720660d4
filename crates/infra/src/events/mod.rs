//! In-process event bus
//!
//! Domain events fan out over a `tokio::sync::broadcast` channel. Subscribers
//! that fall behind lose the oldest events; the bus makes no durability
//! promise.

use async_trait::async_trait;
use relaygate_core::EventPublisher;
use relaygate_domain::{DomainEvent, Result as DomainResult};
use tokio::sync::broadcast;
use tracing::{debug, info};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventPublisher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: DomainEvent) -> DomainResult<()> {
        let name = event.name();
        let workspace_id = event.workspace_id().to_string();

        match self.sender.send(event) {
            Ok(receivers) => {
                info!(event = name, workspace_id = %workspace_id, receivers, "event.published");
            }
            Err(_) => {
                debug!(event = name, workspace_id = %workspace_id, "event.published_without_subscribers");
            }
        }
        Ok(())
    }
}
