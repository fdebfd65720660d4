//! Google OAuth adapter (Calendar/Drive style offline access)

use std::sync::Arc;

use async_trait::async_trait;
use relaygate_common::Clock;
use relaygate_core::{ProviderAdapter, SignatureHeaders, TokenGrant};
use relaygate_domain::constants::GOOGLE_DEFAULT_SCOPES;
use relaygate_domain::{
    AccountIdentity, AuthorizationHints, ClientCredentials, GatewayError, GoogleConfig,
    Integration, ProviderType, Result, TokenSet,
};
use serde::Deserialize;
use url::Url;

use super::{expect_success, expires_at, read_json, required, scopes_or_default, ScopeField};
use crate::http::HttpClient;

const PROVIDER: ProviderType = ProviderType::Google;

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub revoke_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".into(),
            revoke_url: "https://oauth2.googleapis.com/revoke".into(),
        }
    }
}

pub struct GoogleAdapter {
    config: GoogleConfig,
    http: HttpClient,
    clock: Arc<dyn Clock>,
    endpoints: GoogleEndpoints,
}

impl GoogleAdapter {
    pub fn new(config: GoogleConfig, http: HttpClient, clock: Arc<dyn Clock>) -> Self {
        Self { config, http, clock, endpoints: GoogleEndpoints::default() }
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn credentials(&self) -> Result<ClientCredentials> {
        self.config.credentials()
    }

    async fn token_request(&self, form: &[(&str, &str)], operation: &'static str) -> Result<TokenSet> {
        let request = self.http.post(&self.endpoints.token_url).form(form);
        let response = self.http.send(request).await?;
        let body: TokenResponse = read_json(response, PROVIDER, operation).await?;
        Ok(TokenSet::bearer(body.access_token)
            .with_token_type(body.token_type.unwrap_or_else(|| "Bearer".into()))
            .with_refresh_token(body.refresh_token)
            .with_expires_at(expires_at(self.clock.now(), body.expires_in))
            .with_scopes(body.scope.into_vec()))
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn provider_type(&self) -> ProviderType {
        PROVIDER
    }

    fn ensure_configured(&self) -> Result<()> {
        self.credentials().map(|_| ())
    }

    fn scopes(&self) -> Vec<String> {
        scopes_or_default(&self.config.scopes, GOOGLE_DEFAULT_SCOPES)
    }

    fn build_authorization_url(
        &self,
        state: &str,
        scopes: &[String],
        redirect_uri: &str,
        hints: &AuthorizationHints,
    ) -> Result<String> {
        let credentials = self.credentials()?;
        let scope = scopes.join(" ");
        let mut params = vec![
            ("client_id", credentials.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
            // Offline access plus forced consent so a refresh token is always issued.
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("include_granted_scopes", "true"),
        ];
        if let Some(login_hint) = hints.login_hint.as_deref() {
            params.push(("login_hint", login_hint));
        }

        let url = Url::parse_with_params(&self.endpoints.authorize_url, &params)
            .map_err(|e| GatewayError::Configuration(format!("invalid google authorize url: {e}")))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
        let credentials = self.credentials()?;
        let tokens = self
            .token_request(
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                    ("client_id", credentials.client_id.as_str()),
                    ("client_secret", credentials.client_secret.as_str()),
                ],
                "token_exchange",
            )
            .await?;
        Ok(TokenGrant::new(tokens))
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<AccountIdentity> {
        let request = self.http.get(&self.endpoints.userinfo_url).bearer_auth(access_token);
        let response = self.http.send(request).await?;
        let info: UserInfo = read_json(response, PROVIDER, "userinfo").await?;

        let sub = required(info.sub, PROVIDER, "sub")?;
        Ok(AccountIdentity {
            external_account_name: info.email.or(info.name).unwrap_or_else(|| sub.clone()),
            external_account_id: sub,
            // Workspace domain, absent for consumer accounts.
            external_organization_name: info.hd.clone(),
            external_organization_id: info.hd,
        })
    }

    /// Google does not push signed webhooks through the gateway.
    fn verify_webhook_signature(
        &self,
        _raw_body: &[u8],
        _headers: &SignatureHeaders,
        _secret: &str,
    ) -> bool {
        false
    }

    async fn refresh_tokens(
        &self,
        _integration: &Integration,
        refresh_token: Option<&str>,
    ) -> Result<Option<TokenSet>> {
        let refresh_token = refresh_token.ok_or_else(|| {
            GatewayError::OAuthExchange("google integration has no refresh token".into())
        })?;
        let credentials = self.credentials()?;
        let mut tokens = self
            .token_request(
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", credentials.client_id.as_str()),
                    ("client_secret", credentials.client_secret.as_str()),
                ],
                "token_refresh",
            )
            .await?;
        // Google omits the refresh token on refresh responses.
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(Some(tokens))
    }

    async fn revoke_token(&self, _integration: &Integration, access_token: &str) -> Result<()> {
        let request = self.http.post(&self.endpoints.revoke_url).form(&[("token", access_token)]);
        let response = self.http.send(request).await?;
        expect_success(response, PROVIDER, "revoke").await
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: ScopeField,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    hd: Option<String>,
}
