//! Port interfaces for integration persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relaygate_domain::{Integration, IntegrationStatus, ProviderType, Result};

#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    async fn insert(&self, integration: &Integration) -> Result<()>;

    /// Overwrite every mutable column of an existing row.
    async fn update(&self, integration: &Integration) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Integration>>;

    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Integration>>;

    /// The ACTIVE integration for the logical key, if any.
    async fn find_active(
        &self,
        workspace_id: &str,
        provider_type: ProviderType,
        external_organization_id: Option<&str>,
    ) -> Result<Option<Integration>>;

    /// All integrations with this organization id, most recently updated first.
    async fn find_by_external_organization(
        &self,
        provider_type: ProviderType,
        external_organization_id: &str,
    ) -> Result<Vec<Integration>>;

    /// All integrations with this account id, most recently updated first.
    async fn find_by_external_account(
        &self,
        provider_type: ProviderType,
        external_account_id: &str,
    ) -> Result<Vec<Integration>>;

    /// Returns `false` when no row matched.
    async fn update_status(
        &self,
        id: &str,
        status: IntegrationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn touch_last_sync(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Returns `false` when no row matched.
    async fn delete(&self, id: &str) -> Result<bool>;
}
