//! Integration aggregate
//!
//! One integration per (workspace, provider account). Token fields on
//! [`Integration`] always hold vault ciphertext; plaintext only exists in a
//! [`TokenSet`] while a flow or refresh is in progress.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderType;
use crate::errors::GatewayError;

/// Lifecycle status of an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationStatus {
    Pending,
    Active,
    Error,
    Expired,
    Revoked,
}

impl IntegrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
            Self::Expired => "EXPIRED",
            Self::Revoked => "REVOKED",
        }
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACTIVE" => Ok(Self::Active),
            "ERROR" => Ok(Self::Error),
            "EXPIRED" => Ok(Self::Expired),
            "REVOKED" => Ok(Self::Revoked),
            other => Err(GatewayError::Database(format!("unknown integration status: {other}"))),
        }
    }
}

/// Persisted integration record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: String,
    pub workspace_id: String,
    pub provider_type: ProviderType,
    pub status: IntegrationStatus,
    pub external_account_id: String,
    pub external_account_name: Option<String>,
    pub external_organization_id: Option<String>,
    pub external_organization_name: Option<String>,
    pub scopes: BTreeSet<String>,
    /// Vault ciphertext.
    #[serde(skip_serializing)]
    pub access_token: String,
    /// Vault ciphertext.
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Vault ciphertext.
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Integration {
    pub fn is_active(&self) -> bool {
        self.status == IntegrationStatus::Active
    }

    /// True when the access token expires within `skew_secs` of `now`.
    pub fn token_expires_within(&self, now: DateTime<Utc>, skew_secs: i64) -> bool {
        self.token_expires_at
            .is_some_and(|expires_at| expires_at <= now + chrono::Duration::seconds(skew_secs))
    }
}

/// Plaintext token material returned by a provider.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

impl TokenSet {
    /// Bearer token with no refresh token or expiry.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at: None,
            scopes: Vec::new(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    pub fn with_expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Who the credentials belong to on the provider side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
    pub external_account_id: String,
    pub external_account_name: String,
    pub external_organization_id: Option<String>,
    pub external_organization_name: Option<String>,
}

/// Input for creating (or reconnecting) an integration.
#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub workspace_id: String,
    pub created_by: String,
    pub provider_type: ProviderType,
    pub status: IntegrationStatus,
    pub identity: AccountIdentity,
    pub tokens: TokenSet,
    pub webhook_secret: Option<String>,
}
