//! Provider payload normalization
//!
//! Only the routing and classification fields are parsed into typed shapes.
//! The payload itself travels on the envelope untouched.

use relaygate_domain::{GatewayError, ProviderType, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::service::WebhookHeaders;

/// How the owning integration is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingKey {
    /// Linear organization id or Slack team id.
    Organization(String),
    /// GitHub App installation id.
    Installation(String),
    Unroutable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub event_type: String,
    pub action: Option<String>,
    pub external_event_id: Option<String>,
    pub routing: RoutingKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedWebhook {
    Event(NormalizedEvent),
    /// Slack endpoint ownership check.
    UrlVerification { challenge: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinearPayload {
    #[serde(rename = "type")]
    kind: String,
    action: Option<String>,
    organization_id: Option<String>,
    webhook_id: Option<String>,
    webhook_timestamp: Option<i64>,
}

#[derive(Deserialize)]
struct GitHubPayload {
    action: Option<String>,
    installation: Option<GitHubInstallationRef>,
}

#[derive(Deserialize)]
struct GitHubInstallationRef {
    id: u64,
}

#[derive(Deserialize)]
struct SlackPayload {
    #[serde(rename = "type")]
    kind: String,
    challenge: Option<String>,
    team_id: Option<String>,
    event_id: Option<String>,
    event: Option<SlackInnerEvent>,
    #[serde(default)]
    authorizations: Vec<SlackAuthorization>,
}

#[derive(Deserialize)]
struct SlackInnerEvent {
    #[serde(rename = "type")]
    kind: String,
    subtype: Option<String>,
}

#[derive(Deserialize)]
struct SlackAuthorization {
    team_id: Option<String>,
}

pub fn normalize(
    provider: ProviderType,
    headers: &WebhookHeaders,
    payload: &Value,
) -> Result<ParsedWebhook> {
    match provider {
        ProviderType::Linear => normalize_linear(headers, payload),
        ProviderType::Github => normalize_github(headers, payload),
        ProviderType::Slack => normalize_slack(payload),
        ProviderType::Google => Err(GatewayError::InvalidInput(
            "google does not deliver signed webhooks".to_string(),
        )),
    }
}

fn parse<T: DeserializeOwned>(provider: ProviderType, payload: &Value) -> Result<T> {
    T::deserialize(payload).map_err(|e| {
        GatewayError::InvalidInput(format!("malformed {} webhook payload: {e}", provider.slug()))
    })
}

fn normalize_linear(headers: &WebhookHeaders, payload: &Value) -> Result<ParsedWebhook> {
    let body: LinearPayload = parse(ProviderType::Linear, payload)?;

    // Linear retries reuse the delivery header; fall back to the webhook id + timestamp pair.
    let external_event_id = headers.delivery_id.clone().or_else(|| {
        body.webhook_id
            .as_ref()
            .zip(body.webhook_timestamp)
            .map(|(id, ts)| format!("{id}:{ts}"))
    });

    Ok(ParsedWebhook::Event(NormalizedEvent {
        event_type: body.kind,
        action: body.action,
        external_event_id,
        routing: body.organization_id.map_or(RoutingKey::Unroutable, RoutingKey::Organization),
    }))
}

fn normalize_github(headers: &WebhookHeaders, payload: &Value) -> Result<ParsedWebhook> {
    let event_type = headers
        .event_type
        .clone()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| GatewayError::InvalidInput("missing x-github-event header".to_string()))?;
    let body: GitHubPayload = parse(ProviderType::Github, payload)?;

    Ok(ParsedWebhook::Event(NormalizedEvent {
        event_type,
        action: body.action,
        external_event_id: headers.delivery_id.clone(),
        routing: body
            .installation
            .map_or(RoutingKey::Unroutable, |i| RoutingKey::Installation(i.id.to_string())),
    }))
}

fn normalize_slack(payload: &Value) -> Result<ParsedWebhook> {
    let body: SlackPayload = parse(ProviderType::Slack, payload)?;

    if body.kind == "url_verification" {
        let challenge = body
            .challenge
            .ok_or_else(|| GatewayError::InvalidInput("url_verification without challenge".into()))?;
        return Ok(ParsedWebhook::UrlVerification { challenge });
    }

    let team_id = body
        .team_id
        .or_else(|| body.authorizations.into_iter().find_map(|a| a.team_id));
    let (event_type, action) = match body.event {
        Some(event) => (event.kind, event.subtype),
        None => (body.kind, None),
    };

    Ok(ParsedWebhook::Event(NormalizedEvent {
        event_type,
        action,
        external_event_id: body.event_id,
        routing: team_id.map_or(RoutingKey::Unroutable, RoutingKey::Organization),
    }))
}
