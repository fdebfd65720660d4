use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use relaygate_core::IntegrationRepository;
use relaygate_domain::{
    GatewayError, Integration, IntegrationStatus, ProviderType, Result as DomainResult,
};

#[derive(Debug, Default)]
pub struct InMemoryIntegrationRepository {
    rows: RwLock<HashMap<String, Integration>>,
}

impl InMemoryIntegrationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, predicate: impl Fn(&Integration) -> bool) -> Vec<Integration> {
        let mut found: Vec<_> =
            self.rows.read().values().filter(|row| predicate(row)).cloned().collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        found
    }
}

fn same_active_key(a: &Integration, b: &Integration) -> bool {
    a.workspace_id == b.workspace_id
        && a.provider_type == b.provider_type
        && a.external_organization_id.as_deref().unwrap_or_default()
            == b.external_organization_id.as_deref().unwrap_or_default()
}

#[async_trait]
impl IntegrationRepository for InMemoryIntegrationRepository {
    async fn insert(&self, integration: &Integration) -> DomainResult<()> {
        let mut rows = self.rows.write();
        if rows.contains_key(&integration.id) {
            return Err(GatewayError::Database(format!("duplicate id {}", integration.id)));
        }
        if integration.is_active()
            && rows.values().any(|row| row.is_active() && same_active_key(row, integration))
        {
            return Err(GatewayError::Database(
                "unique constraint violation: active integration already exists".into(),
            ));
        }
        rows.insert(integration.id.clone(), integration.clone());
        Ok(())
    }

    async fn update(&self, integration: &Integration) -> DomainResult<()> {
        let mut rows = self.rows.write();
        match rows.get_mut(&integration.id) {
            Some(row) => {
                *row = integration.clone();
                Ok(())
            }
            None => Err(GatewayError::IntegrationNotFound(integration.id.clone())),
        }
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Integration>> {
        Ok(self.rows.read().get(id).cloned())
    }

    async fn list_by_workspace(&self, workspace_id: &str) -> DomainResult<Vec<Integration>> {
        Ok(self.select(|row| row.workspace_id == workspace_id))
    }

    async fn find_active(
        &self,
        workspace_id: &str,
        provider_type: ProviderType,
        external_organization_id: Option<&str>,
    ) -> DomainResult<Option<Integration>> {
        let org = external_organization_id.unwrap_or_default();
        Ok(self
            .select(|row| {
                row.is_active()
                    && row.workspace_id == workspace_id
                    && row.provider_type == provider_type
                    && row.external_organization_id.as_deref().unwrap_or_default() == org
            })
            .into_iter()
            .next())
    }

    async fn find_by_external_organization(
        &self,
        provider_type: ProviderType,
        external_organization_id: &str,
    ) -> DomainResult<Vec<Integration>> {
        Ok(self.select(|row| {
            row.provider_type == provider_type
                && row.external_organization_id.as_deref() == Some(external_organization_id)
        }))
    }

    async fn find_by_external_account(
        &self,
        provider_type: ProviderType,
        external_account_id: &str,
    ) -> DomainResult<Vec<Integration>> {
        Ok(self.select(|row| {
            row.provider_type == provider_type && row.external_account_id == external_account_id
        }))
    }

    async fn update_status(
        &self,
        id: &str,
        status: IntegrationStatus,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut rows = self.rows.write();
        Ok(rows
            .get_mut(id)
            .map(|row| {
                row.status = status;
                row.updated_at = updated_at;
            })
            .is_some())
    }

    async fn touch_last_sync(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(row) = self.rows.write().get_mut(id) {
            row.last_sync_at = Some(at);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        Ok(self.rows.write().remove(id).is_some())
    }
}
