//! # RelayGate Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite repositories for integrations, OAuth states and webhook deliveries
//! - In-memory stores for tests and single-process deployments
//! - Provider adapters (Linear, Slack, Google, GitHub) over a retrying HTTP client
//! - The in-process event bus
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `relaygate-core`
//! - Depends on `relaygate-common`, `relaygate-domain` and `relaygate-core`
//! - Contains all "impure" code (I/O, network, filesystem)

pub mod config;
pub mod database;
pub mod errors;
pub mod events;
pub mod http;
pub mod memory;
pub mod observability;
pub mod providers;

// Re-export commonly used items
pub use database::{
    DbManager, SqliteIntegrationRepository, SqliteOAuthStateStore,
    SqliteWebhookDeliveryRepository,
};
pub use errors::InfraError;
pub use events::BroadcastEventPublisher;
pub use http::{HttpClient, HttpClientBuilder};
pub use memory::{
    InMemoryIntegrationRepository, InMemoryOAuthStateStore, InMemoryWebhookDeliveryRepository,
};
pub use observability::init_tracing;
pub use providers::{build_provider_registry, webhook_secrets};
