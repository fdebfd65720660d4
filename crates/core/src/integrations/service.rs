//! Integration store - lifecycle of the Integration aggregate

use std::sync::Arc;

use relaygate_common::{Clock, SystemClock};
use relaygate_domain::{
    GatewayError, Integration, IntegrationStatus, NewIntegration, ProviderType, Result, TokenSet,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::ports::IntegrationRepository;
use crate::vault::CredentialVault;

/// Result of [`IntegrationStore::connect`].
#[derive(Debug, Clone)]
pub struct ConnectedIntegration {
    pub integration: Integration,
    /// An ACTIVE integration for the same key already existed and was rotated.
    pub reconnected: bool,
}

/// Persists integrations with vault-encrypted credentials.
pub struct IntegrationStore {
    repository: Arc<dyn IntegrationRepository>,
    vault: Arc<CredentialVault>,
    clock: Arc<dyn Clock>,
}

impl IntegrationStore {
    pub fn new(repository: Arc<dyn IntegrationRepository>, vault: Arc<CredentialVault>) -> Self {
        Self { repository, vault, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Insert a new integration. Returns its id.
    pub async fn create(&self, draft: NewIntegration) -> Result<String> {
        let integration = self.build(draft)?;
        self.repository.insert(&integration).await?;
        info!(
            integration_id = %integration.id,
            workspace_id = %integration.workspace_id,
            provider = %integration.provider_type,
            status = %integration.status,
            "integration.created"
        );
        Ok(integration.id)
    }

    /// Create the integration, or rotate the existing ACTIVE one for the same
    /// `(workspace, provider, external organization)` key.
    pub async fn connect(&self, draft: NewIntegration) -> Result<ConnectedIntegration> {
        let existing = self
            .repository
            .find_active(
                &draft.workspace_id,
                draft.provider_type,
                draft.identity.external_organization_id.as_deref(),
            )
            .await?;

        let Some(mut integration) = existing else {
            let id = self.create(draft).await?;
            let integration = self.get(&id).await?;
            return Ok(ConnectedIntegration { integration, reconnected: false });
        };

        let now = self.clock.now();
        integration.status = IntegrationStatus::Active;
        integration.external_account_id = draft.identity.external_account_id;
        integration.external_account_name = Some(draft.identity.external_account_name);
        integration.external_organization_name = draft.identity.external_organization_name;
        self.apply_tokens(&mut integration, &draft.tokens)?;
        if let Some(secret) = draft.webhook_secret.as_deref() {
            integration.webhook_secret = Some(self.vault.encrypt(secret)?);
        }
        integration.updated_at = now;

        self.repository.update(&integration).await?;
        info!(
            integration_id = %integration.id,
            workspace_id = %integration.workspace_id,
            provider = %integration.provider_type,
            "integration.reconnected"
        );
        Ok(ConnectedIntegration { integration, reconnected: true })
    }

    pub async fn get(&self, id: &str) -> Result<Integration> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::IntegrationNotFound(id.to_string()))
    }

    pub async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Integration>> {
        self.repository.list_by_workspace(workspace_id).await
    }

    pub async fn list_active_by_type(
        &self,
        workspace_id: &str,
        provider_type: ProviderType,
    ) -> Result<Vec<Integration>> {
        Ok(self
            .repository
            .list_by_workspace(workspace_id)
            .await?
            .into_iter()
            .filter(|i| i.provider_type == provider_type && i.is_active())
            .collect())
    }

    pub async fn mark_error(&self, id: &str) -> Result<()> {
        self.set_status(id, IntegrationStatus::Error).await
    }

    pub async fn set_status(&self, id: &str, status: IntegrationStatus) -> Result<()> {
        if !self.repository.update_status(id, status, self.clock.now()).await? {
            return Err(GatewayError::IntegrationNotFound(id.to_string()));
        }
        warn!(integration_id = id, status = %status, "integration.status_changed");
        Ok(())
    }

    /// Re-encrypt and store a refreshed token set. A token set without a
    /// refresh token keeps the stored one.
    ///
    /// An `ERROR` integration returns to `ACTIVE` only while no other ACTIVE
    /// integration holds its key. Other statuses are left untouched.
    pub async fn rotate_tokens(&self, id: &str, tokens: &TokenSet) -> Result<Integration> {
        let mut integration = self.get(id).await?;
        self.apply_tokens(&mut integration, tokens)?;
        if integration.status == IntegrationStatus::Error {
            let holder = self
                .repository
                .find_active(
                    &integration.workspace_id,
                    integration.provider_type,
                    integration.external_organization_id.as_deref(),
                )
                .await?;
            match holder {
                None => integration.status = IntegrationStatus::Active,
                Some(other) => warn!(
                    integration_id = id,
                    active_integration_id = %other.id,
                    "integration.reactivation_skipped"
                ),
            }
        }
        integration.updated_at = self.clock.now();
        self.repository.update(&integration).await?;
        info!(integration_id = id, expires_at = ?integration.token_expires_at, "integration.tokens_rotated");
        Ok(integration)
    }

    /// ACTIVE integration owning an external organization (Linear org, Slack team).
    pub async fn resolve_by_external_organization(
        &self,
        provider_type: ProviderType,
        external_organization_id: &str,
    ) -> Result<Option<Integration>> {
        let candidates = self
            .repository
            .find_by_external_organization(provider_type, external_organization_id)
            .await?;
        Ok(first_active(candidates))
    }

    /// ACTIVE integration owning an external account (GitHub installation).
    pub async fn resolve_by_external_account(
        &self,
        provider_type: ProviderType,
        external_account_id: &str,
    ) -> Result<Option<Integration>> {
        let candidates = self
            .repository
            .find_by_external_account(provider_type, external_account_id)
            .await?;
        Ok(first_active(candidates))
    }

    /// Remove the row. Upstream revocation is the caller's job.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.repository.delete(id).await? {
            return Err(GatewayError::IntegrationNotFound(id.to_string()));
        }
        info!(integration_id = id, "integration.deleted");
        Ok(())
    }

    pub async fn record_sync(&self, id: &str) -> Result<()> {
        self.repository.touch_last_sync(id, self.clock.now()).await
    }

    pub fn decrypt_tokens(&self, integration: &Integration) -> Result<TokenSet> {
        Ok(TokenSet {
            access_token: self.vault.decrypt(&integration.access_token)?,
            refresh_token: self.vault.decrypt_optional(integration.refresh_token.as_deref())?,
            token_type: integration.token_type.clone(),
            expires_at: integration.token_expires_at,
            scopes: integration.scopes.iter().cloned().collect(),
        })
    }

    pub fn decrypt_webhook_secret(&self, integration: &Integration) -> Result<Option<String>> {
        self.vault.decrypt_optional(integration.webhook_secret.as_deref())
    }

    fn build(&self, draft: NewIntegration) -> Result<Integration> {
        let now = self.clock.now();
        Ok(Integration {
            id: Uuid::now_v7().to_string(),
            workspace_id: draft.workspace_id,
            provider_type: draft.provider_type,
            status: draft.status,
            external_account_id: draft.identity.external_account_id,
            external_account_name: Some(draft.identity.external_account_name),
            external_organization_id: draft.identity.external_organization_id,
            external_organization_name: draft.identity.external_organization_name,
            scopes: draft.tokens.scopes.iter().cloned().collect(),
            access_token: self.vault.encrypt(&draft.tokens.access_token)?,
            refresh_token: self.vault.encrypt_optional(draft.tokens.refresh_token.as_deref())?,
            token_type: draft.tokens.token_type.clone(),
            token_expires_at: draft.tokens.expires_at,
            webhook_secret: self.vault.encrypt_optional(draft.webhook_secret.as_deref())?,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
            last_sync_at: None,
        })
    }

    fn apply_tokens(&self, integration: &mut Integration, tokens: &TokenSet) -> Result<()> {
        integration.access_token = self.vault.encrypt(&tokens.access_token)?;
        if let Some(refresh_token) = tokens.refresh_token.as_deref() {
            integration.refresh_token = Some(self.vault.encrypt(refresh_token)?);
        }
        integration.token_type = tokens.token_type.clone();
        integration.token_expires_at = tokens.expires_at;
        if !tokens.scopes.is_empty() {
            integration.scopes = tokens.scopes.iter().cloned().collect();
        }
        Ok(())
    }
}

fn first_active(candidates: Vec<Integration>) -> Option<Integration> {
    candidates.into_iter().find(Integration::is_active)
}
