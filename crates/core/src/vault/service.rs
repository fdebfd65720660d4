//! AES-256-GCM credential vault

use relaygate_common::{CommonError, SealingService};
use relaygate_domain::{GatewayError, Result, VaultConfig};

/// Encrypts and decrypts credential strings with the process-wide key.
///
/// Ciphertext is base64 of `nonce || tag || ciphertext`. Every call to
/// [`CredentialVault::encrypt`] draws a fresh nonce.
#[derive(Debug)]
pub struct CredentialVault {
    sealer: SealingService,
}

impl CredentialVault {
    /// Build the vault from configuration. A missing or malformed key is a
    /// configuration error; no key is ever generated on the fly.
    pub fn from_config(config: &VaultConfig) -> Result<Self> {
        Self::from_encoded_key(config.require_key()?)
    }

    pub fn from_encoded_key(encoded: &str) -> Result<Self> {
        let sealer = SealingService::from_encoded_key(encoded).map_err(|e| {
            GatewayError::Configuration(format!("invalid vault encryption key: {e}"))
        })?;
        Ok(Self { sealer })
    }

    pub fn from_key_bytes(key: Vec<u8>) -> Result<Self> {
        let sealer = SealingService::new(key).map_err(|e| {
            GatewayError::Configuration(format!("invalid vault encryption key: {e}"))
        })?;
        Ok(Self { sealer })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.sealer.seal_to_string(plaintext.as_bytes()).map_err(map_error)
    }

    /// Fails with [`GatewayError::Decryption`] on tampered ciphertext, a wrong
    /// key or a malformed blob.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let bytes = self.sealer.open_from_string(ciphertext).map_err(map_error)?;
        String::from_utf8(bytes)
            .map_err(|_| GatewayError::Decryption("plaintext is not valid UTF-8".to_string()))
    }

    pub fn encrypt_optional(&self, plaintext: Option<&str>) -> Result<Option<String>> {
        plaintext.map(|value| self.encrypt(value)).transpose()
    }

    pub fn decrypt_optional(&self, ciphertext: Option<&str>) -> Result<Option<String>> {
        ciphertext.map(|value| self.decrypt(value)).transpose()
    }
}

fn map_error(err: CommonError) -> GatewayError {
    if err.is_integrity_failure() {
        GatewayError::Decryption(err.to_string())
    } else {
        GatewayError::Internal(err.to_string())
    }
}
