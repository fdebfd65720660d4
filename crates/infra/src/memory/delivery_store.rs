use async_trait::async_trait;
use parking_lot::Mutex;
use relaygate_core::{DeliveryClaim, WebhookDeliveryRepository};
use relaygate_domain::{Result as DomainResult, WebhookDelivery};

#[derive(Debug, Default)]
pub struct InMemoryWebhookDeliveryRepository {
    rows: Mutex<Vec<WebhookDelivery>>,
}

impl InMemoryWebhookDeliveryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored delivery, oldest first.
    pub fn deliveries(&self) -> Vec<WebhookDelivery> {
        self.rows.lock().clone()
    }
}

fn same_event(row: &WebhookDelivery, delivery: &WebhookDelivery) -> bool {
    delivery.external_event_id.is_some()
        && row.provider_type == delivery.provider_type
        && row.external_event_id == delivery.external_event_id
}

#[async_trait]
impl WebhookDeliveryRepository for InMemoryWebhookDeliveryRepository {
    async fn claim(&self, delivery: &WebhookDelivery) -> DomainResult<DeliveryClaim> {
        let mut rows = self.rows.lock();
        if let Some(row) = rows.iter_mut().find(|row| same_event(row, delivery)) {
            if row.processed {
                return Ok(DeliveryClaim::Duplicate);
            }
            row.processed = true;
            row.retry_count += 1;
            row.error_message = None;
            row.received_at = delivery.received_at;
            row.integration_id.clone_from(&delivery.integration_id);
            row.workspace_id.clone_from(&delivery.workspace_id);
            row.event_type.clone_from(&delivery.event_type);
            row.action.clone_from(&delivery.action);
            row.raw_payload.clone_from(&delivery.raw_payload);
            return Ok(DeliveryClaim::Claimed {
                delivery_id: row.id.clone(),
                attempt: row.retry_count,
            });
        }

        let mut stored = delivery.clone();
        stored.processed = true;
        rows.push(stored);
        Ok(DeliveryClaim::Claimed { delivery_id: delivery.id.clone(), attempt: delivery.retry_count })
    }

    async fn record_failure(&self, delivery: &WebhookDelivery) -> DomainResult<()> {
        let mut rows = self.rows.lock();
        if !rows.iter().any(|row| same_event(row, delivery)) {
            let mut stored = delivery.clone();
            stored.processed = false;
            rows.push(stored);
        }
        Ok(())
    }

    async fn mark_failed(&self, delivery_id: &str, error_message: &str) -> DomainResult<()> {
        if let Some(row) = self.rows.lock().iter_mut().find(|row| row.id == delivery_id) {
            row.processed = false;
            row.error_message = Some(error_message.to_string());
        }
        Ok(())
    }
}
