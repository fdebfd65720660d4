//! Modular common utilities shared across RelayGate crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors, random tokens, clock abstraction
//! - `runtime`: symmetric sealing and HMAC signatures (enables tracing)
//! - `platform`: SQLite connection pooling
//! - `test-utils`: temporary database fixtures

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod time;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod crypto;
#[cfg(feature = "runtime")]
pub mod security;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod storage;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "platform")))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use auth::state::generate_state_token;
#[cfg(feature = "runtime")]
pub use crypto::{SealedBlob, SealingService};
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult};
#[cfg(feature = "runtime")]
pub use security::signature::{hmac_sha256_hex, verify_hmac_sha256_hex};
#[cfg(feature = "foundation")]
pub use time::{Clock, MockClock, SystemClock};
