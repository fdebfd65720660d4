//! Webhook ingestion - resolve, verify, normalize, dedup, publish

use std::fmt;
use std::sync::Arc;

use relaygate_common::{Clock, SystemClock};
use relaygate_domain::{
    DomainEvent, GatewayError, Integration, ProviderType, Result, WebhookDelivery,
    WebhookEnvelope, WebhookOutcome,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::normalizer::{normalize, NormalizedEvent, ParsedWebhook, RoutingKey};
use super::ports::{DeliveryClaim, WebhookDeliveryRepository};
use crate::event_ports::EventPublisher;
use crate::integrations::IntegrationStore;
use crate::providers::{ProviderRegistry, SignatureHeaders};

/// Provider headers relevant to ingestion, already lower-cased and extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub signature: Option<String>,
    /// Slack request timestamp.
    pub timestamp: Option<String>,
    /// `x-github-event`.
    pub event_type: Option<String>,
    /// `linear-delivery` / `x-github-delivery`.
    pub delivery_id: Option<String>,
    /// `x-slack-retry-num`.
    pub retry_num: Option<u32>,
}

/// One inbound webhook request.
#[derive(Debug, Clone)]
pub struct InboundWebhook {
    pub provider_type: ProviderType,
    pub raw_body: Vec<u8>,
    pub headers: WebhookHeaders,
    /// Explicit `?integrationId=` (GitHub repository webhooks).
    pub integration_id: Option<String>,
}

/// Globally configured webhook secrets.
#[derive(Clone, Default)]
pub struct WebhookSecrets {
    pub linear: Option<String>,
    pub github: Option<String>,
    pub slack_signing_secret: Option<String>,
}

impl fmt::Debug for WebhookSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("WebhookSecrets")
            .field("linear", &set(&self.linear))
            .field("github", &set(&self.github))
            .field("slack_signing_secret", &set(&self.slack_signing_secret))
            .finish()
    }
}

pub struct WebhookIngestor {
    registry: Arc<ProviderRegistry>,
    store: Arc<IntegrationStore>,
    deliveries: Arc<dyn WebhookDeliveryRepository>,
    publisher: Arc<dyn EventPublisher>,
    secrets: WebhookSecrets,
    clock: Arc<dyn Clock>,
}

impl WebhookIngestor {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<IntegrationStore>,
        deliveries: Arc<dyn WebhookDeliveryRepository>,
        publisher: Arc<dyn EventPublisher>,
        secrets: WebhookSecrets,
    ) -> Self {
        Self { registry, store, deliveries, publisher, secrets, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Process one webhook. Never fails: every outcome is reported in the
    /// returned body, which the transport answers with HTTP 200.
    pub async fn ingest(&self, request: InboundWebhook) -> WebhookOutcome {
        let provider = request.provider_type;

        let payload: Value = match serde_json::from_slice(&request.raw_body) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(provider = %provider, error = %err, "webhook.invalid_payload");
                return WebhookOutcome::ignored(None, "invalid_payload");
            }
        };

        let event = match normalize(provider, &request.headers, &payload) {
            Ok(ParsedWebhook::Event(event)) => event,
            Ok(ParsedWebhook::UrlVerification { challenge }) => {
                return self.answer_url_verification(&request, challenge);
            }
            Err(err) => {
                warn!(provider = %provider, error = %err, "webhook.invalid_payload");
                return WebhookOutcome::ignored(None, "invalid_payload");
            }
        };

        let integration = match self.resolve(&request, &event).await {
            Ok(Some(integration)) => integration,
            Ok(None) => {
                info!(provider = %provider, routing = ?event.routing, "webhook.integration_not_found");
                return WebhookOutcome::ignored(None, "integration_not_found");
            }
            Err(err) => {
                error!(provider = %provider, error = %err, "webhook.resolve_failed");
                return WebhookOutcome::ignored(None, err.code());
            }
        };
        let integration_id = integration.id.clone();

        if let Err(err) = self.verify(&request, &integration) {
            warn!(
                integration_id = %integration_id,
                workspace_id = %integration.workspace_id,
                provider = %provider,
                error = %err,
                "webhook.signature_rejected"
            );
            self.record_failure(&request, &integration, &event, &err).await;
            return WebhookOutcome::rejected(Some(integration_id), err.code());
        }

        let delivery = self.delivery(&request, &integration, &event);
        let delivery_id = match self.deliveries.claim(&delivery).await {
            Ok(DeliveryClaim::Claimed { delivery_id, attempt }) => {
                debug!(integration_id = %integration_id, delivery_id = %delivery_id, attempt, "webhook.claimed");
                delivery_id
            }
            Ok(DeliveryClaim::Duplicate) => {
                info!(
                    integration_id = %integration_id,
                    external_event_id = ?event.external_event_id,
                    retry_num = ?request.headers.retry_num,
                    "webhook.duplicate"
                );
                return WebhookOutcome::processed(integration_id);
            }
            Err(err) => {
                error!(integration_id = %integration_id, error = %err, "webhook.claim_failed");
                return WebhookOutcome::ignored(Some(integration_id), err.code());
            }
        };

        if provider == ProviderType::Github && event.event_type == "ping" {
            info!(integration_id = %integration_id, "webhook.ping");
            return WebhookOutcome::processed(integration_id);
        }

        let envelope = WebhookEnvelope {
            integration_id: integration.id.clone(),
            workspace_id: integration.workspace_id.clone(),
            provider_type: provider,
            event_type: event.event_type.clone(),
            action: event.action.clone(),
            external_event_id: event.external_event_id.clone(),
            payload,
            emitted_at: self.clock.now(),
        };

        if let Err(err) = self.publisher.publish(DomainEvent::WebhookReceived(envelope)).await {
            error!(integration_id = %integration_id, error = %err, "webhook.publish_failed");
            if let Err(mark_err) = self.deliveries.mark_failed(&delivery_id, &err.to_string()).await {
                error!(delivery_id = %delivery_id, error = %mark_err, "webhook.mark_failed_failed");
            }
            return WebhookOutcome::ignored(Some(integration_id), "publish_failed");
        }

        if let Err(err) = self.store.record_sync(&integration_id).await {
            warn!(integration_id = %integration_id, error = %err, "integration.record_sync_failed");
        }

        info!(
            integration_id = %integration_id,
            workspace_id = %integration.workspace_id,
            provider = %provider,
            event_type = %event.event_type,
            "webhook.published"
        );
        WebhookOutcome::processed(integration_id)
    }

    fn answer_url_verification(&self, request: &InboundWebhook, challenge: String) -> WebhookOutcome {
        let verified = self
            .secret_for_global(request.provider_type)
            .and_then(|secret| self.check_signature(request, &secret));
        match verified {
            Ok(()) => WebhookOutcome::challenge(challenge),
            Err(err) => {
                warn!(provider = %request.provider_type, error = %err, "webhook.signature_rejected");
                WebhookOutcome::rejected(None, err.code())
            }
        }
    }

    async fn resolve(
        &self,
        request: &InboundWebhook,
        event: &NormalizedEvent,
    ) -> Result<Option<Integration>> {
        let provider = request.provider_type;

        if let Some(id) = request.integration_id.as_deref().filter(|id| !id.is_empty()) {
            return match self.store.get(id).await {
                Ok(integration) if integration.provider_type == provider && integration.is_active() => {
                    Ok(Some(integration))
                }
                Ok(_) | Err(GatewayError::IntegrationNotFound(_)) => Ok(None),
                Err(err) => Err(err),
            };
        }

        match &event.routing {
            RoutingKey::Organization(org_id) => {
                self.store.resolve_by_external_organization(provider, org_id).await
            }
            RoutingKey::Installation(installation_id) => {
                self.store.resolve_by_external_account(provider, installation_id).await
            }
            RoutingKey::Unroutable => Ok(None),
        }
    }

    fn verify(&self, request: &InboundWebhook, integration: &Integration) -> Result<()> {
        let secret = match request.provider_type {
            ProviderType::Github => match self.store.decrypt_webhook_secret(integration)? {
                Some(secret) => secret,
                None => self.secret_for_global(ProviderType::Github)?,
            },
            other => self.secret_for_global(other)?,
        };
        self.check_signature(request, &secret)
    }

    fn secret_for_global(&self, provider: ProviderType) -> Result<String> {
        let secret = match provider {
            ProviderType::Linear => self.secrets.linear.as_ref(),
            ProviderType::Github => self.secrets.github.as_ref(),
            ProviderType::Slack => self.secrets.slack_signing_secret.as_ref(),
            ProviderType::Google => None,
        };
        secret.filter(|s| !s.is_empty()).cloned().ok_or_else(|| {
            GatewayError::Configuration(format!("{} webhook secret is not configured", provider.slug()))
        })
    }

    fn check_signature(&self, request: &InboundWebhook, secret: &str) -> Result<()> {
        let adapter = self.registry.get(request.provider_type)?;
        let headers = SignatureHeaders::new(request.headers.signature.clone())
            .with_timestamp(request.headers.timestamp.clone());

        if adapter.verify_webhook_signature(&request.raw_body, &headers, secret) {
            Ok(())
        } else {
            Err(GatewayError::SignatureVerification(format!(
                "{} signature did not verify",
                request.provider_type.slug()
            )))
        }
    }

    fn delivery(
        &self,
        request: &InboundWebhook,
        integration: &Integration,
        event: &NormalizedEvent,
    ) -> WebhookDelivery {
        WebhookDelivery {
            id: Uuid::now_v7().to_string(),
            integration_id: integration.id.clone(),
            workspace_id: integration.workspace_id.clone(),
            provider_type: request.provider_type,
            event_type: event.event_type.clone(),
            action: event.action.clone(),
            external_event_id: event.external_event_id.clone(),
            raw_payload: String::from_utf8_lossy(&request.raw_body).into_owned(),
            received_at: self.clock.now(),
            processed: true,
            error_message: None,
            retry_count: request.headers.retry_num.unwrap_or(0),
        }
    }

    async fn record_failure(
        &self,
        request: &InboundWebhook,
        integration: &Integration,
        event: &NormalizedEvent,
        err: &GatewayError,
    ) {
        let mut delivery = self.delivery(request, integration, event);
        delivery.processed = false;
        delivery.error_message = Some(err.code().to_string());
        if let Err(record_err) = self.deliveries.record_failure(&delivery).await {
            error!(integration_id = %integration.id, error = %record_err, "webhook.audit_failed");
        }
    }
}
