//! SQLite implementations of the core storage ports

pub mod integration_repository;
pub mod manager;
pub mod oauth_state_repository;
mod support;
pub mod webhook_delivery_repository;

pub use integration_repository::SqliteIntegrationRepository;
pub use manager::DbManager;
pub use oauth_state_repository::SqliteOAuthStateStore;
pub use webhook_delivery_repository::SqliteWebhookDeliveryRepository;
