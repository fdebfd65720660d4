//! GitHub OAuth App (user-to-server) calls
//!
//! The token endpoint answers 200 with an `error` field on failure, so the
//! body is inspected even on success statuses.

use relaygate_core::{classify_github_token, GitHubTokenKind};
use relaygate_domain::{AccountIdentity, GatewayError, Result, TokenSet};
use serde::Deserialize;
use serde_json::json;

use super::{github_headers, GitHubAdapter, PROVIDER};
use crate::providers::{expect_success, expires_at, read_json, ScopeField};

impl GitHubAdapter {
    pub(super) async fn user_token_request(
        &self,
        form: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<TokenSet> {
        let url = format!("{}/login/oauth/access_token", self.endpoints.web_base);
        let request = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form);
        let response = self.http.send(request).await?;
        let body: UserTokenResponse = read_json(response, PROVIDER, operation).await?;

        if let Some(error) = body.error {
            return Err(GatewayError::OAuthExchange(format!(
                "github {operation} failed: {error}{}",
                body.error_description.map(|d| format!(" ({d})")).unwrap_or_default()
            )));
        }
        let access_token = body.access_token.ok_or_else(|| {
            GatewayError::OAuthExchange(format!("github {operation} returned no access token"))
        })?;

        Ok(TokenSet::bearer(access_token)
            .with_refresh_token(body.refresh_token)
            .with_expires_at(expires_at(self.clock.now(), body.expires_in))
            .with_scopes(body.scope.into_vec()))
    }

    pub(super) async fn user_identity(&self, access_token: &str) -> Result<AccountIdentity> {
        let kind = classify_github_token(access_token);
        if kind == GitHubTokenKind::InstallationToken {
            return Err(GatewayError::InvalidInput(
                "installation tokens cannot resolve a github user".into(),
            ));
        }

        let url = format!("{}/user", self.endpoints.api_base);
        let request = github_headers(self.http.get(url))
            .header(reqwest::header::AUTHORIZATION, kind.authorization(access_token));
        let response = self.http.send(request).await?;
        let user: GitHubUser = read_json(response, PROVIDER, "user_lookup").await?;

        Ok(AccountIdentity {
            external_account_id: user.id.to_string(),
            external_account_name: user.login,
            external_organization_id: None,
            external_organization_name: None,
        })
    }

    /// Delete a user grant token via the OAuth App's basic credentials.
    pub(super) async fn revoke_user_token(&self, access_token: &str) -> Result<()> {
        let credentials = self.config.credentials()?;
        let url = format!(
            "{}/applications/{}/token",
            self.endpoints.api_base,
            urlencoding::encode(&credentials.client_id)
        );
        let request = github_headers(self.http.delete(url))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .json(&json!({ "access_token": access_token }));
        let response = self.http.send(request).await?;
        expect_success(response, PROVIDER, "revoke_user_token").await
    }
}

#[derive(Debug, Deserialize)]
struct UserTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: ScopeField,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
}
