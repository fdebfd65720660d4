//! In-memory port implementations for testing

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relaygate_core::{
    DeliveryClaim, EventPublisher, IntegrationRepository, OAuthStateStore,
    WebhookDeliveryRepository,
};
use relaygate_domain::{
    DomainEvent, GatewayError, Integration, IntegrationStatus, OAuthState, ProviderType,
    Result as DomainResult, WebhookDelivery, WebhookEnvelope,
};

#[derive(Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, OAuthState>>,
}

impl MemoryStateStore {
    pub fn len(&self) -> usize {
        self.states.lock().len()
    }
}

#[async_trait]
impl OAuthStateStore for MemoryStateStore {
    async fn insert(&self, state: OAuthState) -> DomainResult<()> {
        self.states.lock().insert(state.state.clone(), state);
        Ok(())
    }

    async fn consume(&self, state: &str, now: DateTime<Utc>) -> DomainResult<Option<OAuthState>> {
        let mut states = self.states.lock();
        match states.get_mut(state) {
            Some(record) if record.is_redeemable_at(now) => {
                record.consumed = true;
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        let mut states = self.states.lock();
        let before = states.len();
        states.retain(|_, s| s.is_redeemable_at(now));
        Ok(before - states.len())
    }
}

#[derive(Default)]
pub struct MemoryIntegrationRepository {
    rows: Mutex<HashMap<String, Integration>>,
}

impl MemoryIntegrationRepository {
    pub fn all(&self) -> Vec<Integration> {
        self.rows.lock().values().cloned().collect()
    }

    pub fn seed(&self, integration: Integration) {
        self.rows.lock().insert(integration.id.clone(), integration);
    }

    fn matching(&self, predicate: impl Fn(&Integration) -> bool) -> Vec<Integration> {
        let mut found: Vec<_> = self.rows.lock().values().filter(|i| predicate(i)).cloned().collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        found
    }
}

#[async_trait]
impl IntegrationRepository for MemoryIntegrationRepository {
    async fn insert(&self, integration: &Integration) -> DomainResult<()> {
        let mut rows = self.rows.lock();
        if rows.contains_key(&integration.id) {
            return Err(GatewayError::Database("duplicate id".into()));
        }
        rows.insert(integration.id.clone(), integration.clone());
        Ok(())
    }

    async fn update(&self, integration: &Integration) -> DomainResult<()> {
        self.rows.lock().insert(integration.id.clone(), integration.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Integration>> {
        Ok(self.rows.lock().get(id).cloned())
    }

    async fn list_by_workspace(&self, workspace_id: &str) -> DomainResult<Vec<Integration>> {
        Ok(self.matching(|i| i.workspace_id == workspace_id))
    }

    async fn find_active(
        &self,
        workspace_id: &str,
        provider_type: ProviderType,
        external_organization_id: Option<&str>,
    ) -> DomainResult<Option<Integration>> {
        Ok(self
            .matching(|i| {
                i.workspace_id == workspace_id
                    && i.provider_type == provider_type
                    && i.external_organization_id.as_deref() == external_organization_id
                    && i.is_active()
            })
            .into_iter()
            .next())
    }

    async fn find_by_external_organization(
        &self,
        provider_type: ProviderType,
        external_organization_id: &str,
    ) -> DomainResult<Vec<Integration>> {
        Ok(self.matching(|i| {
            i.provider_type == provider_type
                && i.external_organization_id.as_deref() == Some(external_organization_id)
        }))
    }

    async fn find_by_external_account(
        &self,
        provider_type: ProviderType,
        external_account_id: &str,
    ) -> DomainResult<Vec<Integration>> {
        Ok(self.matching(|i| {
            i.provider_type == provider_type && i.external_account_id == external_account_id
        }))
    }

    async fn update_status(
        &self,
        id: &str,
        status: IntegrationStatus,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        Ok(self
            .rows
            .lock()
            .get_mut(id)
            .map(|row| {
                row.status = status;
                row.updated_at = updated_at;
            })
            .is_some())
    }

    async fn touch_last_sync(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(row) = self.rows.lock().get_mut(id) {
            row.last_sync_at = Some(at);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        Ok(self.rows.lock().remove(id).is_some())
    }
}

#[derive(Default)]
pub struct MemoryDeliveryRepository {
    rows: Mutex<Vec<WebhookDelivery>>,
}

impl MemoryDeliveryRepository {
    pub fn all(&self) -> Vec<WebhookDelivery> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl WebhookDeliveryRepository for MemoryDeliveryRepository {
    async fn claim(&self, delivery: &WebhookDelivery) -> DomainResult<DeliveryClaim> {
        let mut rows = self.rows.lock();
        if let Some(event_id) = delivery.external_event_id.as_deref() {
            let existing = rows.iter_mut().find(|row| {
                row.provider_type == delivery.provider_type
                    && row.external_event_id.as_deref() == Some(event_id)
            });
            if let Some(row) = existing {
                if row.processed {
                    return Ok(DeliveryClaim::Duplicate);
                }
                row.processed = true;
                row.retry_count += 1;
                row.error_message = None;
                row.integration_id.clone_from(&delivery.integration_id);
                row.workspace_id.clone_from(&delivery.workspace_id);
                row.raw_payload.clone_from(&delivery.raw_payload);
                return Ok(DeliveryClaim::Claimed {
                    delivery_id: row.id.clone(),
                    attempt: row.retry_count,
                });
            }
        }

        let mut stored = delivery.clone();
        stored.processed = true;
        rows.push(stored);
        Ok(DeliveryClaim::Claimed { delivery_id: delivery.id.clone(), attempt: 0 })
    }

    async fn record_failure(&self, delivery: &WebhookDelivery) -> DomainResult<()> {
        let mut rows = self.rows.lock();
        let duplicate = delivery.external_event_id.is_some()
            && rows.iter().any(|row| {
                row.provider_type == delivery.provider_type
                    && row.external_event_id == delivery.external_event_id
            });
        if !duplicate {
            rows.push(delivery.clone());
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

/// Captures every published event; can be told to fail.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
    fail: Mutex<bool>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    pub fn envelopes(&self) -> Vec<WebhookEnvelope> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DomainEvent::WebhookReceived(envelope) => Some(envelope.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn fail_next(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: DomainEvent) -> DomainResult<()> {
        if std::mem::take(&mut *self.fail.lock()) {
            return Err(GatewayError::Network("bus unavailable".into()));
        }
        self.events.lock().push(event);
        Ok(())
    }
}
