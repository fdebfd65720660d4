//! Shared cryptographic primitives used across runtime and platform features.

pub mod encryption;

pub use encryption::{SealedBlob, SealingService, KEY_LEN, NONCE_LEN, TAG_LEN};
