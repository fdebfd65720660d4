use std::sync::Arc;

use relaygate_common::Clock;
use relaygate_core::{ProviderRegistry, WebhookSecrets};
use relaygate_domain::ProvidersConfig;
use tracing::info;

use super::{GitHubAdapter, GoogleAdapter, LinearAdapter, SlackAdapter};
use crate::http::HttpClient;

/// Register every provider adapter.
///
/// Unconfigured providers are still registered; their `ensure_configured`
/// reports the missing credentials when a flow is started.
pub fn build_provider_registry(
    config: &ProvidersConfig,
    http: HttpClient,
    clock: Arc<dyn Clock>,
) -> ProviderRegistry {
    let github = GitHubAdapter::new(config.github.clone(), http.clone(), Arc::clone(&clock));
    info!(
        linear = config.linear.credentials().is_ok(),
        slack = config.slack.credentials().is_ok(),
        google = config.google.credentials().is_ok(),
        github_oauth = config.github.credentials().is_ok(),
        github_app = github.uses_app_installation(),
        "providers.registered"
    );

    ProviderRegistry::new()
        .with_adapter(Arc::new(LinearAdapter::new(
            config.linear.clone(),
            http.clone(),
            Arc::clone(&clock),
        )))
        .with_adapter(Arc::new(SlackAdapter::new(
            config.slack.clone(),
            http.clone(),
            Arc::clone(&clock),
        )))
        .with_adapter(Arc::new(GoogleAdapter::new(config.google.clone(), http, clock)))
        .with_adapter(Arc::new(github))
}

/// Global webhook secrets from provider configuration.
pub fn webhook_secrets(config: &ProvidersConfig) -> WebhookSecrets {
    WebhookSecrets {
        linear: config.linear.webhook_secret().map(str::to_string),
        github: config.github.webhook_secret().map(str::to_string),
        slack_signing_secret: config.slack.signing_secret().map(str::to_string),
    }
}
