//! Webhook receivers
//!
//! Every receiver answers 200 with a [`WebhookOutcome`] body, including for
//! rejected deliveries, so providers do not hammer us with retries.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use relaygate_core::{InboundWebhook, WebhookHeaders};
use relaygate_domain::{ProviderType, WebhookOutcome};
use serde::Deserialize;

use super::SharedContext;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubWebhookQuery {
    #[serde(alias = "integration_id")]
    pub integration_id: Option<String>,
}

/// POST /integrations/webhooks/linear
pub async fn linear(
    State(ctx): State<SharedContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookOutcome> {
    ingest(&ctx, ProviderType::Linear, &headers, body, None).await
}

/// POST /integrations/webhooks/github
pub async fn github(
    State(ctx): State<SharedContext>,
    Query(query): Query<GithubWebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookOutcome> {
    let integration_id = query.integration_id.filter(|id| !id.trim().is_empty());
    ingest(&ctx, ProviderType::Github, &headers, body, integration_id).await
}

/// POST /integrations/webhooks/slack
pub async fn slack(
    State(ctx): State<SharedContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookOutcome> {
    ingest(&ctx, ProviderType::Slack, &headers, body, None).await
}

async fn ingest(
    ctx: &SharedContext,
    provider: ProviderType,
    headers: &HeaderMap,
    body: Bytes,
    integration_id: Option<String>,
) -> Json<WebhookOutcome> {
    let outcome = ctx
        .ingestor
        .ingest(InboundWebhook {
            provider_type: provider,
            raw_body: body.to_vec(),
            headers: webhook_headers(provider, headers),
            integration_id,
        })
        .await;
    Json(outcome)
}

/// Pull the provider's signature and delivery headers.
pub fn webhook_headers(provider: ProviderType, headers: &HeaderMap) -> WebhookHeaders {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    match provider {
        ProviderType::Linear => WebhookHeaders {
            signature: header("linear-signature"),
            delivery_id: header("linear-delivery"),
            event_type: header("linear-event"),
            ..WebhookHeaders::default()
        },
        ProviderType::Github => WebhookHeaders {
            signature: header("x-hub-signature-256"),
            event_type: header("x-github-event"),
            delivery_id: header("x-github-delivery"),
            ..WebhookHeaders::default()
        },
        ProviderType::Slack => WebhookHeaders {
            signature: header("x-slack-signature"),
            timestamp: header("x-slack-request-timestamp"),
            retry_num: header("x-slack-retry-num").and_then(|n| n.parse().ok()),
            ..WebhookHeaders::default()
        },
        ProviderType::Google => WebhookHeaders::default(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn github_headers_are_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-hub-signature-256", HeaderValue::from_static("sha256=abc"));
        headers.insert("x-github-event", HeaderValue::from_static("pull_request"));
        headers.insert("x-github-delivery", HeaderValue::from_static("d-1"));

        let extracted = webhook_headers(ProviderType::Github, &headers);
        assert_eq!(extracted.signature.as_deref(), Some("sha256=abc"));
        assert_eq!(extracted.event_type.as_deref(), Some("pull_request"));
        assert_eq!(extracted.delivery_id.as_deref(), Some("d-1"));
        assert!(extracted.timestamp.is_none());
    }

    #[test]
    fn slack_retry_num_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert("x-slack-signature", HeaderValue::from_static("v0=ff"));
        headers.insert("x-slack-request-timestamp", HeaderValue::from_static("1700000000"));
        headers.insert("x-slack-retry-num", HeaderValue::from_static("2"));

        let extracted = webhook_headers(ProviderType::Slack, &headers);
        assert_eq!(extracted.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(extracted.retry_num, Some(2));
    }

    #[test]
    fn headers_of_other_providers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-hub-signature-256", HeaderValue::from_static("sha256=abc"));

        assert_eq!(webhook_headers(ProviderType::Linear, &headers), WebhookHeaders::default());
    }
}
