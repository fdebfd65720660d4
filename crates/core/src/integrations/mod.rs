//! Integration aggregate persistence

pub mod ports;
pub mod service;

pub use service::{ConnectedIntegration, IntegrationStore};
