//! Random CSRF state tokens.

use rand::RngCore;

/// Entropy of a state token in bytes (hex-encoded to twice as many chars).
pub const STATE_TOKEN_BYTES: usize = 32;

/// Generate a random state token for CSRF protection.
///
/// Returns 32 bytes from the thread-local CSPRNG, hex-encoded (64 chars).
pub fn generate_state_token() -> String {
    random_hex(STATE_TOKEN_BYTES)
}

/// Hex-encode `len` random bytes.
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
