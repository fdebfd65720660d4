//! Inbound webhook types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderType;

/// Provider-independent representation of an inbound webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    pub integration_id: String,
    pub workspace_id: String,
    pub provider_type: ProviderType,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_event_id: Option<String>,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

/// Audit record of a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDelivery {
    pub id: String,
    pub integration_id: String,
    pub workspace_id: String,
    pub provider_type: ProviderType,
    pub event_type: String,
    pub action: Option<String>,
    pub external_event_id: Option<String>,
    pub raw_payload: String,
    pub received_at: DateTime<Utc>,
    pub processed: bool,
    pub error_message: Option<String>,
    pub retry_count: u32,
}

/// Response body returned to the provider. Always sent with HTTP 200.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    pub received: bool,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Slack URL verification echo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

impl WebhookOutcome {
    pub fn processed(integration_id: impl Into<String>) -> Self {
        Self {
            received: true,
            processed: true,
            integration_id: Some(integration_id.into()),
            ..Self::default()
        }
    }

    /// Accepted but not published (unknown integration, bad payload, ...).
    pub fn ignored(integration_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            received: true,
            processed: false,
            integration_id,
            error: Some(error.into()),
            challenge: None,
        }
    }

    /// Refused at the security boundary.
    pub fn rejected(integration_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            received: false,
            processed: false,
            integration_id,
            error: Some(error.into()),
            challenge: None,
        }
    }

    pub fn challenge(challenge: impl Into<String>) -> Self {
        Self {
            received: true,
            processed: true,
            challenge: Some(challenge.into()),
            ..Self::default()
        }
    }
}
