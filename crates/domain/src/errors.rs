//! Error types used throughout the gateway

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for RelayGate
///
/// Security-relevant variants (`InvalidState`, `SignatureVerification`) carry
/// messages for logs only; the HTTP surface exposes [`GatewayError::code`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum GatewayError {
    /// Provider or vault not configured. Raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// CSRF state missing, expired, replayed or mismatched.
    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),

    /// Upstream token or identity call failed.
    #[error("OAuth exchange failed: {0}")]
    OAuthExchange(String),

    /// Webhook signature did not verify.
    #[error("Signature verification failed: {0}")]
    SignatureVerification(String),

    /// Stored credential could not be decrypted.
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// No usable integration for the lookup key.
    #[error("Integration not found: {0}")]
    IntegrationNotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable code, safe to expose in redirects.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "not_configured",
            Self::InvalidState(_) => "invalid_state",
            Self::OAuthExchange(_) | Self::Network(_) => "oauth_failed",
            Self::SignatureVerification(_) => "signature_invalid",
            Self::Decryption(_) => "decryption_failed",
            Self::IntegrationNotFound(_) => "integration_not_found",
            Self::InvalidInput(_) => "missing_params",
            Self::Database(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// Failures that must never be retried automatically.
    pub fn is_security_failure(&self) -> bool {
        matches!(self, Self::InvalidState(_) | Self::SignatureVerification(_))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
