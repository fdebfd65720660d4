//! # RelayGate Domain
//!
//! Business domain types for the integration gateway.
//!
//! This crate contains:
//! - Provider, integration, OAuth state and webhook types
//! - Domain events published to the bus
//! - Configuration structures
//! - The `GatewayError` taxonomy and `Result` alias
//!
//! ## Architecture
//! - No dependencies on other RelayGate crates
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
