//! # RelayGate Core
//!
//! Gateway business logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for storage, providers and the event bus
//! - The credential vault
//! - OAuth state management and flow orchestration
//! - Integration lifecycle and webhook ingestion services
//!
//! ## Architecture Principles
//! - Only depends on `relaygate-common` and `relaygate-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod integrations;
pub mod oauth;
pub mod providers;
pub mod vault;
pub mod webhooks;

// Infrastructure ports
pub mod event_ports;

// Re-export specific items to avoid ambiguity
pub use event_ports::EventPublisher;
pub use integrations::ports::IntegrationRepository;
pub use integrations::{ConnectedIntegration, IntegrationStore};
pub use oauth::{
    Disconnected, FlowFailure, FlowStage, InitRequest, OAuthOrchestrator, OAuthStateStore,
    StateManager,
};
pub use providers::{
    classify_github_token, GitHubTokenKind, ProviderAdapter, ProviderRegistry, SignatureHeaders,
    TokenGrant,
};
pub use vault::CredentialVault;
pub use webhooks::{
    DeliveryClaim, InboundWebhook, WebhookDeliveryRepository, WebhookHeaders, WebhookIngestor,
    WebhookSecrets,
};
