//! AES-256-GCM sealing with a self-describing blob layout.
//!
//! Every call to [`SealingService::seal`] draws a fresh 96-bit nonce. The
//! output keeps nonce and authentication tag separate from the ciphertext:
//!
//! ```text
//! nonce (12 bytes) || tag (16 bytes) || ciphertext (n bytes)
//! ```
//!
//! [`SealingService::seal_to_string`] base64-encodes that layout for storage in
//! text columns.
//!
//! ```rust,ignore
//! use relaygate_common::crypto::SealingService;
//!
//! let service = SealingService::new(SealingService::generate_key())?;
//! let sealed = service.seal_to_string(b"xoxb-secret")?;
//! assert_eq!(service.open_from_string(&sealed)?, b"xoxb-secret");
//! ```

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CommonError, CommonResult};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Decomposed sealed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlob {
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl SealedBlob {
    /// Serialise as `nonce || tag || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + TAG_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split a `nonce || tag || ciphertext` buffer.
    pub fn from_bytes(bytes: &[u8]) -> CommonResult<Self> {
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(CommonError::malformed(
                "sealed blob",
                format!("expected at least {} bytes, got {}", NONCE_LEN + TAG_LEN, bytes.len()),
            ));
        }

        let (nonce, rest) = bytes.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| CommonError::malformed("sealed blob", "nonce slice has wrong length"))?;
        let tag: [u8; TAG_LEN] = tag
            .try_into()
            .map_err(|_| CommonError::malformed("sealed blob", "tag slice has wrong length"))?;

        Ok(Self { nonce, tag, ciphertext: ciphertext.to_vec() })
    }
}

/// AES-256-GCM sealing service keyed once per process.
pub struct SealingService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SealingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealingService").field("key", &"[REDACTED]").finish()
    }
}

impl SealingService {
    /// Create a service from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::config(format!(
                "encryption key must be exactly {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CommonError::config(format!("failed to create cipher: {e}")))?;

        Ok(Self { cipher })
    }

    /// Create a service from a textual key: 64 hex chars or base64 of 32 bytes.
    pub fn from_encoded_key(encoded: &str) -> CommonResult<Self> {
        Self::new(decode_key(encoded)?)
    }

    /// Generate a random 32-byte symmetric key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Encrypt `plaintext` under a fresh nonce.
    pub fn seal(&self, plaintext: &[u8]) -> CommonResult<SealedBlob> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|e| CommonError::internal(format!("encryption failed: {e}")))?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(tag.as_slice());

        Ok(SealedBlob { nonce, tag: tag_bytes, ciphertext: buffer })
    }

    /// Authenticate and decrypt `blob`.
    pub fn open(&self, blob: &SealedBlob) -> CommonResult<Vec<u8>> {
        let mut buffer = blob.ciphertext.clone();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&blob.nonce),
                b"",
                &mut buffer,
                Tag::from_slice(&blob.tag),
            )
            .map_err(|_| CommonError::decryption("authentication tag mismatch"))?;
        Ok(buffer)
    }

    /// Seal and base64-encode the `nonce || tag || ciphertext` layout.
    pub fn seal_to_string(&self, plaintext: &[u8]) -> CommonResult<String> {
        Ok(BASE64.encode(self.seal(plaintext)?.to_bytes()))
    }

    /// Decode a base64 blob and open it.
    pub fn open_from_string(&self, encoded: &str) -> CommonResult<Vec<u8>> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CommonError::malformed("base64", e.to_string()))?;
        self.open(&SealedBlob::from_bytes(&bytes)?)
    }
}

fn decode_key(encoded: &str) -> CommonResult<Vec<u8>> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(CommonError::config("encryption key is empty"));
    }

    if trimmed.len() == KEY_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex::decode(trimmed).map_err(|e| CommonError::malformed("hex", e.to_string()));
    }

    let decoded = BASE64
        .decode(trimmed)
        .map_err(|e| CommonError::config(format!("encryption key is neither hex nor base64: {e}")))?;

    if decoded.len() != KEY_LEN {
        return Err(CommonError::config(format!(
            "encryption key must decode to {KEY_LEN} bytes, got {}",
            decoded.len()
        )));
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> SealingService {
        SealingService::new(SealingService::generate_key()).expect("service")
    }

    #[test]
    fn rejects_short_keys() {
        let err = SealingService::new(vec![0u8; 16]).unwrap_err();
        assert!(matches!(err, CommonError::Config { .. }));
    }

    #[test]
    fn blob_layout_places_nonce_then_tag() {
        let service = service();
        let blob = service.seal(b"hello").expect("seal");
        let bytes = blob.to_bytes();

        assert_eq!(bytes.len(), NONCE_LEN + TAG_LEN + 5);
        assert_eq!(&bytes[..NONCE_LEN], &blob.nonce);
        assert_eq!(&bytes[NONCE_LEN..NONCE_LEN + TAG_LEN], &blob.tag);
        assert_eq!(SealedBlob::from_bytes(&bytes).expect("parse"), blob);
    }

    #[test]
    fn fresh_nonce_per_call() {
        let service = service();
        let a = service.seal(b"same").expect("seal");
        let b = service.seal(b"same").expect("seal");
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn tampered_ciphertext_fails_to_open() {
        let service = service();
        let mut blob = service.seal(b"refresh-token").expect("seal");
        blob.ciphertext[0] ^= 0x01;

        let err = service.open(&blob).unwrap_err();
        assert!(matches!(err, CommonError::Decryption { .. }));
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let sealed = service().seal_to_string(b"token").expect("seal");
        let err = service().open_from_string(&sealed).unwrap_err();
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn truncated_blob_is_malformed() {
        let err = SealedBlob::from_bytes(&[0u8; 20]).unwrap_err();
        assert!(matches!(err, CommonError::Malformed { .. }));
    }

    #[test]
    fn decodes_hex_and_base64_keys() {
        let key = SealingService::generate_key();
        let hex_key = hex::encode(&key);
        let b64_key = BASE64.encode(&key);

        let from_hex = SealingService::from_encoded_key(&hex_key).expect("hex key");
        let from_b64 = SealingService::from_encoded_key(&b64_key).expect("base64 key");

        let sealed = from_hex.seal_to_string(b"interop").expect("seal");
        assert_eq!(from_b64.open_from_string(&sealed).expect("open"), b"interop");
    }

    #[test]
    fn empty_key_is_config_error() {
        let err = SealingService::from_encoded_key("   ").unwrap_err();
        assert!(matches!(err, CommonError::Config { .. }));
    }

    #[test]
    fn debug_redacts_key() {
        let rendered = format!("{:?}", service());
        assert!(rendered.contains("REDACTED"));
    }
}
