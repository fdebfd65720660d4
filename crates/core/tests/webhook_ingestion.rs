//! Webhook ingestion tests: routing, signatures, dedup, audit.

mod support;

use std::sync::Arc;

use relaygate_common::hmac_sha256_hex;
use relaygate_core::{InboundWebhook, WebhookHeaders};
use relaygate_domain::{
    AccountIdentity, IntegrationStatus, NewIntegration, ProviderType, TokenSet,
};
use serde_json::json;
use support::{FakeAdapter, Harness, GITHUB_SECRET, LINEAR_SECRET, SLACK_SECRET};

fn harness() -> Harness {
    Harness::new(vec![
        Arc::new(FakeAdapter::new(ProviderType::Linear)),
        Arc::new(FakeAdapter::new(ProviderType::Github)),
        Arc::new(FakeAdapter::new(ProviderType::Slack)),
    ])
}

async fn connect(
    harness: &Harness,
    provider: ProviderType,
    account: &str,
    org: Option<&str>,
    webhook_secret: Option<&str>,
) -> String {
    harness
        .store
        .create(NewIntegration {
            workspace_id: "W1".into(),
            created_by: "U1".into(),
            provider_type: provider,
            status: IntegrationStatus::Active,
            identity: AccountIdentity {
                external_account_id: account.into(),
                external_account_name: "acct".into(),
                external_organization_id: org.map(Into::into),
                external_organization_name: None,
            },
            tokens: TokenSet::bearer("token"),
            webhook_secret: webhook_secret.map(Into::into),
        })
        .await
        .expect("seed integration")
}

fn sign(secret: &str, body: &[u8]) -> String {
    hmac_sha256_hex(secret.as_bytes(), body).expect("hmac")
}

fn linear_webhook(body: &[u8], signature: String, delivery: &str) -> InboundWebhook {
    InboundWebhook {
        provider_type: ProviderType::Linear,
        raw_body: body.to_vec(),
        headers: WebhookHeaders {
            signature: Some(signature),
            delivery_id: Some(delivery.into()),
            ..Default::default()
        },
        integration_id: None,
    }
}

fn github_webhook(body: &[u8], signature: String, integration_id: Option<String>) -> InboundWebhook {
    InboundWebhook {
        provider_type: ProviderType::Github,
        raw_body: body.to_vec(),
        headers: WebhookHeaders {
            signature: Some(signature),
            event_type: Some("push".into()),
            delivery_id: Some("gh-delivery-1".into()),
            ..Default::default()
        },
        integration_id,
    }
}

#[tokio::test]
async fn linear_webhook_is_published_once() {
    let harness = harness();
    let id = connect(&harness, ProviderType::Linear, "user", Some("org_1"), None).await;
    let body = json!({"type": "Issue", "action": "update", "organizationId": "org_1"}).to_string();

    let outcome = harness
        .ingestor
        .ingest(linear_webhook(body.as_bytes(), sign(LINEAR_SECRET, body.as_bytes()), "d-1"))
        .await;
    assert!(outcome.received && outcome.processed);
    assert_eq!(outcome.integration_id.as_deref(), Some(id.as_str()));

    let duplicate = harness
        .ingestor
        .ingest(linear_webhook(body.as_bytes(), sign(LINEAR_SECRET, body.as_bytes()), "d-1"))
        .await;
    assert!(duplicate.processed);

    let envelopes = harness.publisher.envelopes();
    assert_eq!(envelopes.len(), 1, "duplicate delivery must not publish again");
    let envelope = &envelopes[0];
    assert_eq!(envelope.integration_id, id);
    assert_eq!(envelope.workspace_id, "W1");
    assert_eq!(envelope.event_type, "Issue");
    assert_eq!(envelope.action.as_deref(), Some("update"));
    assert_eq!(envelope.external_event_id.as_deref(), Some("d-1"));
    assert_eq!(envelope.payload["organizationId"], "org_1");

    let integration = harness.store.get(&id).await.expect("integration");
    assert!(integration.last_sync_at.is_some());
}

#[tokio::test]
async fn bad_signature_is_rejected_and_audited() {
    let harness = harness();
    let id = connect(&harness, ProviderType::Linear, "user", Some("org_1"), None).await;
    let body = json!({"type": "Issue", "organizationId": "org_1"}).to_string();

    let outcome = harness
        .ingestor
        .ingest(linear_webhook(body.as_bytes(), sign("wrong-secret", body.as_bytes()), "d-2"))
        .await;

    assert!(!outcome.received);
    assert!(!outcome.processed);
    assert_eq!(outcome.error.as_deref(), Some("signature_invalid"));
    assert!(harness.publisher.envelopes().is_empty());

    let audit = harness.deliveries.all();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].integration_id, id);
    assert!(!audit[0].processed);
}

#[tokio::test]
async fn unknown_or_inactive_integration_is_not_found() {
    let harness = harness();
    let id = connect(&harness, ProviderType::Linear, "user", Some("org_1"), None).await;
    harness.store.set_status(&id, IntegrationStatus::Revoked).await.expect("revoke");

    for org in ["org_1", "org_unknown"] {
        let body = json!({"type": "Issue", "organizationId": org}).to_string();
        let outcome = harness
            .ingestor
            .ingest(linear_webhook(body.as_bytes(), sign(LINEAR_SECRET, body.as_bytes()), org))
            .await;
        assert!(!outcome.processed);
        assert_eq!(outcome.error.as_deref(), Some("integration_not_found"));
    }
    assert!(harness.publisher.envelopes().is_empty());
}

#[tokio::test]
async fn github_webhook_by_integration_id_with_per_integration_secret() {
    let harness = harness();
    let id = connect(&harness, ProviderType::Github, "gh-user", None, Some("repo-secret")).await;
    let body = br#"{"ref":"refs/heads/main"}"#;

    let outcome = harness
        .ingestor
        .ingest(github_webhook(body, sign("repo-secret", body), Some(id.clone())))
        .await;
    assert!(outcome.processed, "{outcome:?}");
    assert_eq!(harness.publisher.envelopes()[0].event_type, "push");

    let mut tampered = sign("repo-secret", body);
    let last = tampered.pop().expect("non-empty");
    tampered.push(if last == '0' { '1' } else { '0' });
    let mut request = github_webhook(body, tampered, Some(id));
    request.headers.delivery_id = Some("gh-delivery-2".into());

    let rejected = harness.ingestor.ingest(request).await;
    assert!(!rejected.processed);
    assert_eq!(harness.publisher.envelopes().len(), 1);
}

#[tokio::test]
async fn github_webhook_routes_by_installation_with_global_secret() {
    let harness = harness();
    let id = connect(&harness, ProviderType::Github, "12345", Some("9001"), None).await;
    let body = json!({"action": "opened", "installation": {"id": 12345}}).to_string();

    let outcome = harness
        .ingestor
        .ingest(github_webhook(body.as_bytes(), sign(GITHUB_SECRET, body.as_bytes()), None))
        .await;
    assert!(outcome.processed);
    assert_eq!(outcome.integration_id.as_deref(), Some(id.as_str()));
}

#[tokio::test]
async fn github_ping_is_acknowledged_without_publishing() {
    let harness = harness();
    let id = connect(&harness, ProviderType::Github, "gh-user", None, None).await;
    let body = br#"{"zen":"Keep it logically awesome."}"#;
    let mut request = github_webhook(body, sign(GITHUB_SECRET, body), Some(id));
    request.headers.event_type = Some("ping".into());

    let outcome = harness.ingestor.ingest(request).await;
    assert!(outcome.processed);
    assert!(harness.publisher.envelopes().is_empty());
}

#[tokio::test]
async fn slack_url_verification_echoes_challenge() {
    let harness = harness();
    let body = json!({"type": "url_verification", "challenge": "3eZbrw1aB"}).to_string();
    let request = InboundWebhook {
        provider_type: ProviderType::Slack,
        raw_body: body.clone().into_bytes(),
        headers: WebhookHeaders {
            signature: Some(sign(SLACK_SECRET, body.as_bytes())),
            ..Default::default()
        },
        integration_id: None,
    };

    let outcome = harness.ingestor.ingest(request).await;
    assert_eq!(outcome.challenge.as_deref(), Some("3eZbrw1aB"));

    let unsigned = InboundWebhook {
        provider_type: ProviderType::Slack,
        raw_body: body.into_bytes(),
        headers: WebhookHeaders::default(),
        integration_id: None,
    };
    let outcome = harness.ingestor.ingest(unsigned).await;
    assert!(outcome.challenge.is_none());
    assert!(!outcome.received);
}

#[tokio::test]
async fn slack_event_routes_by_team_and_dedups_retries() {
    let harness = harness();
    let id = connect(&harness, ProviderType::Slack, "U-bot", Some("T123"), None).await;
    let body = json!({
        "type": "event_callback",
        "team_id": "T123",
        "event_id": "Ev1",
        "event": {"type": "app_mention"}
    })
    .to_string();

    for retry in [None, Some(1)] {
        let request = InboundWebhook {
            provider_type: ProviderType::Slack,
            raw_body: body.clone().into_bytes(),
            headers: WebhookHeaders {
                signature: Some(sign(SLACK_SECRET, body.as_bytes())),
                retry_num: retry,
                ..Default::default()
            },
            integration_id: None,
        };
        let outcome = harness.ingestor.ingest(request).await;
        assert_eq!(outcome.integration_id.as_deref(), Some(id.as_str()));
    }

    let envelopes = harness.publisher.envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].event_type, "app_mention");
}

#[tokio::test]
async fn publish_failure_allows_a_later_retry() {
    let harness = harness();
    connect(&harness, ProviderType::Linear, "user", Some("org_1"), None).await;
    let body = json!({"type": "Issue", "organizationId": "org_1"}).to_string();
    let request = || linear_webhook(body.as_bytes(), sign(LINEAR_SECRET, body.as_bytes()), "d-9");

    harness.publisher.fail_next(true);
    let failed = harness.ingestor.ingest(request()).await;
    assert!(!failed.processed);
    assert_eq!(failed.error.as_deref(), Some("publish_failed"));

    let retried = harness.ingestor.ingest(request()).await;
    assert!(retried.processed);
    assert_eq!(harness.publisher.envelopes().len(), 1);
    assert_eq!(harness.deliveries.all()[0].retry_count, 1);
}

#[tokio::test]
async fn malformed_body_is_ignored() {
    let harness = harness();
    let outcome = harness
        .ingestor
        .ingest(linear_webhook(b"not json", sign(LINEAR_SECRET, b"not json"), "d"))
        .await;
    assert_eq!(outcome.error.as_deref(), Some("invalid_payload"));
    assert!(!outcome.processed);
}
