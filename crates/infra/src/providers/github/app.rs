//! GitHub App installation calls

use chrono::{DateTime, Utc};
use relaygate_core::classify_github_token;
use relaygate_domain::{AccountIdentity, GatewayError, GitHubAppCredentials, Result, TokenSet};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::jwt::sign_app_jwt;
use super::{github_headers, GitHubAdapter, INSTALLATION_TOKEN_TYPE, PROVIDER};
use crate::providers::{expect_success, read_json};

impl GitHubAdapter {
    pub(super) fn app_credentials(&self) -> Result<&GitHubAppCredentials> {
        self.app.as_ref().ok_or_else(|| {
            GatewayError::Configuration("github app credentials are not configured".into())
        })
    }

    /// Mint an installation access token (valid for one hour).
    pub(super) async fn mint_installation_token(&self, installation_id: &str) -> Result<TokenSet> {
        let app = self.app_credentials()?;
        let jwt = sign_app_jwt(app, self.clock.now())?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.endpoints.api_base,
            urlencoding::encode(installation_id)
        );

        let request = github_headers(self.http.post(url)).bearer_auth(jwt);
        let response = self.http.send(request).await?;
        let body: InstallationTokenResponse =
            read_json(response, PROVIDER, "installation_token").await?;

        debug!(provider = PROVIDER.slug(), installation_id, "provider.installation_token_minted");
        Ok(TokenSet::bearer(body.token)
            .with_token_type(INSTALLATION_TOKEN_TYPE)
            .with_expires_at(body.expires_at)
            .with_scopes(
                body.permissions
                    .into_iter()
                    .map(|(permission, level)| format!("{permission}:{level}"))
                    .collect(),
            ))
    }

    /// Account the App was installed on.
    pub(super) async fn installation_identity(&self, installation_id: &str) -> Result<AccountIdentity> {
        let app = self.app_credentials()?;
        let jwt = sign_app_jwt(app, self.clock.now())?;
        let url = format!(
            "{}/app/installations/{}",
            self.endpoints.api_base,
            urlencoding::encode(installation_id)
        );

        let request = github_headers(self.http.get(url)).bearer_auth(jwt);
        let response = self.http.send(request).await?;
        let body: Installation = read_json(response, PROVIDER, "installation_lookup").await?;
        let account = body.account.ok_or_else(|| {
            GatewayError::OAuthExchange("github installation has no account".into())
        })?;

        Ok(AccountIdentity {
            external_account_id: installation_id.to_string(),
            external_account_name: account.login.clone(),
            external_organization_id: Some(account.id.to_string()),
            external_organization_name: Some(account.login),
        })
    }

    pub(super) async fn revoke_installation_token(&self, token: &str) -> Result<()> {
        let url = format!("{}/installation/token", self.endpoints.api_base);
        let request = github_headers(self.http.delete(url))
            .header(reqwest::header::AUTHORIZATION, classify_github_token(token).authorization(token));
        let response = self.http.send(request).await?;
        expect_success(response, PROVIDER, "revoke_installation_token").await
    }
}

#[derive(Debug, Deserialize)]
struct InstallationTokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    permissions: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Installation {
    #[serde(default)]
    account: Option<InstallationAccount>,
}

#[derive(Debug, Deserialize)]
struct InstallationAccount {
    login: String,
    id: i64,
}
