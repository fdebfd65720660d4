//! Domain events published to the event bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderType;
use super::webhook::WebhookEnvelope;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationConnected {
    pub integration_id: String,
    pub workspace_id: String,
    pub user_id: String,
    pub integration_type: ProviderType,
    pub external_account_id: String,
    pub external_account_name: String,
    pub external_organization_id: Option<String>,
    pub external_organization_name: Option<String>,
    pub emitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationDisconnected {
    pub integration_id: String,
    pub workspace_id: String,
    pub integration_type: ProviderType,
    /// Whether the provider acknowledged token revocation.
    pub revoked_upstream: bool,
    pub emitted_at: DateTime<Utc>,
}

/// Everything the gateway publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    IntegrationConnected(IntegrationConnected),
    IntegrationDisconnected(IntegrationDisconnected),
    WebhookReceived(WebhookEnvelope),
}

impl DomainEvent {
    /// Dotted event name used in logs and as the bus topic.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IntegrationConnected(_) => "integration.connected",
            Self::IntegrationDisconnected(_) => "integration.disconnected",
            Self::WebhookReceived(_) => "webhook.received",
        }
    }

    pub fn workspace_id(&self) -> &str {
        match self {
            Self::IntegrationConnected(e) => &e.workspace_id,
            Self::IntegrationDisconnected(e) => &e.workspace_id,
            Self::WebhookReceived(e) => &e.workspace_id,
        }
    }
}
