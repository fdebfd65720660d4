//! Shared test helpers for `relaygate-core` integration tests.
//!
//! In-memory port implementations and a scriptable provider adapter, so the
//! service tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod adapters;
pub mod repositories;

use std::sync::Arc;

use relaygate_common::{MockClock, SealingService};
use relaygate_core::{
    CredentialVault, IntegrationStore, OAuthOrchestrator, ProviderRegistry, StateManager,
    WebhookIngestor, WebhookSecrets,
};

pub use adapters::FakeAdapter;
pub use repositories::{
    MemoryDeliveryRepository, MemoryIntegrationRepository, MemoryStateStore, RecordingPublisher,
};

pub const APP_URL: &str = "https://gateway.test";
pub const LINEAR_SECRET: &str = "linear-webhook-secret";
pub const GITHUB_SECRET: &str = "github-webhook-secret";
pub const SLACK_SECRET: &str = "slack-signing-secret";

/// Fully wired services over in-memory ports.
pub struct Harness {
    pub clock: MockClock,
    pub states_store: Arc<MemoryStateStore>,
    pub integrations: Arc<MemoryIntegrationRepository>,
    pub deliveries: Arc<MemoryDeliveryRepository>,
    pub publisher: Arc<RecordingPublisher>,
    pub vault: Arc<CredentialVault>,
    pub states: Arc<StateManager>,
    pub store: Arc<IntegrationStore>,
    pub orchestrator: OAuthOrchestrator,
    pub ingestor: WebhookIngestor,
}

impl Harness {
    pub fn new(adapters: Vec<Arc<FakeAdapter>>) -> Self {
        let clock = MockClock::new();
        let states_store = Arc::new(MemoryStateStore::default());
        let integrations = Arc::new(MemoryIntegrationRepository::default());
        let deliveries = Arc::new(MemoryDeliveryRepository::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let vault = Arc::new(
            CredentialVault::from_key_bytes(SealingService::generate_key()).expect("vault"),
        );

        let mut registry = ProviderRegistry::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        let registry = Arc::new(registry);

        let states = Arc::new(
            StateManager::new(states_store.clone()).with_clock(Arc::new(clock.clone())),
        );
        let store = Arc::new(
            IntegrationStore::new(integrations.clone(), vault.clone())
                .with_clock(Arc::new(clock.clone())),
        );
        let orchestrator = OAuthOrchestrator::new(
            registry.clone(),
            states.clone(),
            store.clone(),
            publisher.clone(),
            APP_URL,
        )
        .with_clock(Arc::new(clock.clone()));
        let ingestor = WebhookIngestor::new(
            registry,
            store.clone(),
            deliveries.clone(),
            publisher.clone(),
            WebhookSecrets {
                linear: Some(LINEAR_SECRET.into()),
                github: Some(GITHUB_SECRET.into()),
                slack_signing_secret: Some(SLACK_SECRET.into()),
            },
        )
        .with_clock(Arc::new(clock.clone()));

        Self {
            clock,
            states_store,
            integrations,
            deliveries,
            publisher,
            vault,
            states,
            store,
            orchestrator,
            ingestor,
        }
    }
}
