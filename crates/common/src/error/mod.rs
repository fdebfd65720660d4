//! Common error types shared by the primitive modules.
//!
//! Higher layers map these into their own taxonomy; nothing in this crate
//! knows about gateway semantics.

use thiserror::Error;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Error variants produced by the common primitives.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommonError {
    /// Key material or other settings are invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Authenticated decryption rejected the input
    #[error("Decryption failed: {message}")]
    Decryption { message: String },

    /// Input could not be decoded (base64, hex, length)
    #[error("Malformed input ({format}): {message}")]
    Malformed { format: String, message: String },

    /// Storage layer failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CommonError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption { message: message.into() }
    }

    pub fn malformed(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed { format: format.into(), message: message.into() }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// True when the failure means "this ciphertext cannot be trusted".
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Decryption { .. } | Self::Malformed { .. })
    }
}
