//! GitHub App JWT signing
//!
//! App-level calls authenticate with a short-lived RS256 JWT whose issuer is
//! the App id. `iat` is backdated to absorb clock drift between us and GitHub.

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use relaygate_domain::constants::{GITHUB_APP_JWT_BACKDATE_SECS, GITHUB_APP_JWT_TTL_SECS};
use relaygate_domain::{GatewayError, GitHubAppCredentials, Result};
use serde::{Deserialize, Serialize};

use crate::errors::InfraError;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AppClaims {
    pub(crate) fn issued_at(app_id: &str, now: DateTime<Utc>) -> Self {
        let now = now.timestamp();
        Self {
            iat: now - GITHUB_APP_JWT_BACKDATE_SECS,
            exp: now + GITHUB_APP_JWT_TTL_SECS,
            iss: app_id.to_string(),
        }
    }
}

/// Sign an App JWT valid from `now - 60s` to `now + 9min`.
pub(crate) fn sign_app_jwt(app: &GitHubAppCredentials, now: DateTime<Utc>) -> Result<String> {
    let key = EncodingKey::from_rsa_pem(app.private_key.as_bytes())
        .map_err(|e| GatewayError::from(InfraError::from(e)))?;
    encode(&Header::new(Algorithm::RS256), &AppClaims::issued_at(&app.app_id, now), &key)
        .map_err(|e| GatewayError::from(InfraError::from(e)))
}
