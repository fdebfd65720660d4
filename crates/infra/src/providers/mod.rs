//! Provider adapters
//!
//! One [`ProviderAdapter`](relaygate_core::ProviderAdapter) per provider. Base
//! URLs are overridable so tests can point adapters at a mock server.

pub mod github;
pub mod google;
pub mod linear;
mod registry;
pub mod slack;

use std::collections::BTreeSet;

use relaygate_domain::{GatewayError, ProviderType, Result};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

pub use github::{GitHubAdapter, GitHubEndpoints};
pub use google::{GoogleAdapter, GoogleEndpoints};
pub use linear::{LinearAdapter, LinearEndpoints};
pub use registry::{build_provider_registry, webhook_secrets};
pub use slack::{SlackAdapter, SlackEndpoints};

const MAX_LOGGED_BODY: usize = 512;

/// Parse a successful JSON response, or turn a non-2xx into `OAuthExchange`.
///
/// The upstream status and (truncated) body are logged; neither reaches the
/// caller-facing message.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    provider: ProviderType,
    operation: &'static str,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(
            provider = provider.slug(),
            operation,
            status = status.as_u16(),
            body = %truncate(&body),
            "provider.request_failed"
        );
        return Err(GatewayError::OAuthExchange(format!(
            "{} {operation} returned HTTP {}",
            provider.slug(),
            status.as_u16()
        )));
    }

    response.json::<T>().await.map_err(|e| {
        warn!(provider = provider.slug(), operation, error = %e, "provider.response_unparseable");
        GatewayError::OAuthExchange(format!("{} {operation} response was malformed", provider.slug()))
    })
}

/// Require a 2xx with no interesting body (revocation endpoints).
pub(crate) async fn expect_success(
    response: Response,
    provider: ProviderType,
    operation: &'static str,
) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    warn!(
        provider = provider.slug(),
        operation,
        status = status.as_u16(),
        body = %truncate(&body),
        "provider.request_failed"
    );
    Err(GatewayError::Network(format!(
        "{} {operation} returned HTTP {}",
        provider.slug(),
        status.as_u16()
    )))
}

/// Reject blank required identity fields.
pub(crate) fn required(value: Option<String>, provider: ProviderType, field: &str) -> Result<String> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        GatewayError::OAuthExchange(format!("{} response is missing {field}", provider.slug()))
    })
}

/// `expires_in` seconds relative to `now`.
pub(crate) fn expires_at(
    now: chrono::DateTime<chrono::Utc>,
    expires_in: Option<i64>,
) -> Option<chrono::DateTime<chrono::Utc>> {
    expires_in.filter(|secs| *secs > 0).map(|secs| now + chrono::Duration::seconds(secs))
}

/// Scopes arrive as a list, a space-separated string or a comma-separated
/// string depending on the provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub(crate) enum ScopeField {
    List(Vec<String>),
    Joined(String),
    #[default]
    Missing,
}

impl ScopeField {
    pub(crate) fn into_vec(self) -> Vec<String> {
        let scopes: BTreeSet<String> = match self {
            Self::List(list) => list.into_iter().collect(),
            Self::Joined(joined) => joined
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Self::Missing => BTreeSet::new(),
        };
        scopes.into_iter().collect()
    }
}

/// Configured scopes, or the provider defaults when none are configured.
pub(crate) fn scopes_or_default(configured: &[String], defaults: &[&str]) -> Vec<String> {
    if configured.is_empty() {
        defaults.iter().map(|s| (*s).to_string()).collect()
    } else {
        configured.to_vec()
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_LOGGED_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
