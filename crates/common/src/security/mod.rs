//! Message authentication helpers for inbound request verification.

pub mod signature;

pub use signature::{hmac_sha256, hmac_sha256_hex, verify_hmac_sha256_hex};
