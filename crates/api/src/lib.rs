//! # RelayGate API
//!
//! HTTP surface and process entry point.
//!
//! This crate contains:
//! - axum routes for OAuth init/callback, webhooks and integration management
//! - Application context (dependency injection)
//! - Health reporting
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture
//! - Maps `GatewayError` onto HTTP responses

pub mod context;
pub mod error;
pub mod extract;
pub mod routes;
pub mod utils;

pub use context::{AppContext, Stores};
pub use routes::build_router;
