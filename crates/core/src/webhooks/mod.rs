//! Webhook ingestion and normalization

pub mod normalizer;
pub mod ports;
pub mod service;

pub use normalizer::{normalize, NormalizedEvent, ParsedWebhook, RoutingKey};
pub use ports::{DeliveryClaim, WebhookDeliveryRepository};
pub use service::{InboundWebhook, WebhookHeaders, WebhookIngestor, WebhookSecrets};
