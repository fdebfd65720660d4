//! In-process implementations of the storage ports
//!
//! Suitable for tests and single-process deployments; nothing survives a
//! restart.

mod delivery_store;
mod integration_store;
mod state_store;

pub use delivery_store::InMemoryWebhookDeliveryRepository;
pub use integration_store::InMemoryIntegrationRepository;
pub use state_store::InMemoryOAuthStateStore;
