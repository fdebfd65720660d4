//! OAuth flow artifacts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderType;

/// Single-use CSRF state binding an authorization request to its callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    pub state: String,
    pub nonce: String,
    pub workspace_id: String,
    pub user_id: String,
    pub provider_type: ProviderType,
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl OAuthState {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Usable by a callback at `now`.
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired_at(now)
    }
}

/// Optional provider-specific hints forwarded on init.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationHints {
    /// Slack workspace (`team`) to preselect.
    pub team: Option<String>,
    /// Google account to preselect.
    pub login_hint: Option<String>,
}

/// What the provider sent back to the callback endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub installation_id: Option<String>,
    pub setup_action: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Outcome of a completed authorization flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFlow {
    pub integration_id: String,
    pub redirect_url: Option<String>,
    pub reconnected: bool,
}
