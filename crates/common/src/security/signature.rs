//! HMAC-SHA256 signing and constant-time verification.
//!
//! Providers differ in what they sign (raw body, `v0:{ts}:{body}`) and how
//! they prefix the header (`sha256=`, `v0=`, none). Callers build the signed
//! message and strip the prefix; this module only computes and compares.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{CommonError, CommonResult};

type HmacSha256 = Hmac<Sha256>;

/// Raw HMAC-SHA256 of `message` under `secret`.
pub fn hmac_sha256(secret: &[u8], message: &[u8]) -> CommonResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| CommonError::internal(format!("HMAC initialization failed: {e}")))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

/// Lowercase hex HMAC-SHA256 of `message` under `secret`.
pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> CommonResult<String> {
    Ok(hex::encode(hmac_sha256(secret, message)?))
}

/// Compare `provided_hex` against the HMAC of `message` in constant time.
///
/// Returns `false` for empty secrets, non-hex input and length mismatches
/// instead of erroring: a signature that cannot be parsed is simply wrong.
pub fn verify_hmac_sha256_hex(secret: &[u8], message: &[u8], provided_hex: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    let Ok(provided) = hex::decode(provided_hex.trim()) else {
        return false;
    };

    let Ok(expected) = hmac_sha256(secret, message) else {
        return false;
    };

    if provided.len() != expected.len() {
        return false;
    }

    provided.as_slice().ct_eq(expected.as_slice()).into()
}
