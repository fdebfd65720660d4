//! Linear OAuth adapter
//!
//! Identity comes from two GraphQL reads (`viewer`, then `organization`).
//! Webhooks are signed with one global secret as a hex HMAC-SHA256 in the
//! `linear-signature` header.

use std::sync::Arc;

use async_trait::async_trait;
use relaygate_common::{verify_hmac_sha256_hex, Clock};
use relaygate_core::{ProviderAdapter, SignatureHeaders, TokenGrant};
use relaygate_domain::constants::LINEAR_DEFAULT_SCOPES;
use relaygate_domain::{
    AccountIdentity, AuthorizationHints, ClientCredentials, GatewayError, Integration,
    LinearConfig, ProviderType, Result, TokenSet,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{expect_success, expires_at, read_json, required, scopes_or_default, ScopeField};
use crate::http::HttpClient;

const PROVIDER: ProviderType = ProviderType::Linear;

#[derive(Debug, Clone)]
pub struct LinearEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub graphql_url: String,
}

impl Default for LinearEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://linear.app/oauth/authorize".into(),
            token_url: "https://api.linear.app/oauth/token".into(),
            revoke_url: "https://api.linear.app/oauth/revoke".into(),
            graphql_url: "https://api.linear.app/graphql".into(),
        }
    }
}

pub struct LinearAdapter {
    config: LinearConfig,
    http: HttpClient,
    clock: Arc<dyn Clock>,
    endpoints: LinearEndpoints,
}

impl LinearAdapter {
    pub fn new(config: LinearConfig, http: HttpClient, clock: Arc<dyn Clock>) -> Self {
        Self { config, http, clock, endpoints: LinearEndpoints::default() }
    }

    pub fn with_endpoints(mut self, endpoints: LinearEndpoints) -> Self {
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
        Ok(body.into_token_set(self.clock.now()))
    }

    async fn graphql<T: for<'de> Deserialize<'de>>(
        &self,
        access_token: &str,
        query: &str,
        operation: &'static str,
    ) -> Result<T> {
        let request = self
            .http
            .post(&self.endpoints.graphql_url)
            .bearer_auth(access_token)
            .json(&json!({ "query": query }));
        let response = self.http.send(request).await?;
        let body: GraphQlResponse<T> = read_json(response, PROVIDER, operation).await?;

        if let Some(error) = body.errors.and_then(|errors| errors.into_iter().next()) {
            return Err(GatewayError::OAuthExchange(format!(
                "linear {operation} failed: {}",
                error.message
            )));
        }
        body.data.ok_or_else(|| {
            GatewayError::OAuthExchange(format!("linear {operation} returned no data"))
        })
    }
}

#[async_trait]
impl ProviderAdapter for LinearAdapter {
    fn provider_type(&self) -> ProviderType {
        PROVIDER
    }

    fn ensure_configured(&self) -> Result<()> {
        self.credentials().map(|_| ())
    }

    fn scopes(&self) -> Vec<String> {
        scopes_or_default(&self.config.scopes, LINEAR_DEFAULT_SCOPES)
    }

    fn build_authorization_url(
        &self,
        state: &str,
        scopes: &[String],
        redirect_uri: &str,
        _hints: &AuthorizationHints,
    ) -> Result<String> {
        let credentials = self.credentials()?;
        let url = Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scopes.join(",").as_str()),
                ("state", state),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| GatewayError::Configuration(format!("invalid linear authorize url: {e}")))?;
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
        debug!(provider = PROVIDER.slug(), "provider.code_exchanged");
        Ok(TokenGrant::new(tokens))
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<AccountIdentity> {
        let viewer: ViewerData = self
            .graphql(access_token, "query { viewer { id name email } }", "viewer_query")
            .await?;
        let organization: OrganizationData = self
            .graphql(access_token, "query { organization { id name } }", "organization_query")
            .await?;

        let name = viewer.viewer.name.or(viewer.viewer.email);
        let account_id = required(viewer.viewer.id, PROVIDER, "viewer.id")?;
        Ok(AccountIdentity {
            external_account_name: name.unwrap_or_else(|| account_id.clone()),
            external_account_id: account_id,
            external_organization_id: organization.organization.id,
            external_organization_name: organization.organization.name,
        })
    }

    fn verify_webhook_signature(
        &self,
        raw_body: &[u8],
        headers: &SignatureHeaders,
        secret: &str,
    ) -> bool {
        match headers.signature.as_deref() {
            Some(signature) => verify_hmac_sha256_hex(secret.as_bytes(), raw_body, signature.trim()),
            None => false,
        }
    }

    async fn refresh_tokens(
        &self,
        _integration: &Integration,
        refresh_token: Option<&str>,
    ) -> Result<Option<TokenSet>> {
        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };
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
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(Some(tokens))
    }

    async fn revoke_token(&self, _integration: &Integration, access_token: &str) -> Result<()> {
        let request = self.http.post(&self.endpoints.revoke_url).bearer_auth(access_token);
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

impl TokenResponse {
    fn into_token_set(self, now: chrono::DateTime<chrono::Utc>) -> TokenSet {
        TokenSet::bearer(self.access_token)
            .with_token_type(self.token_type.unwrap_or_else(|| "Bearer".into()))
            .with_refresh_token(self.refresh_token)
            .with_expires_at(expires_at(now, self.expires_in))
            .with_scopes(self.scope.into_vec())
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: Viewer,
}

#[derive(Debug, Deserialize)]
struct Viewer {
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganizationData {
    organization: Organization,
}

#[derive(Debug, Deserialize)]
struct Organization {
    id: Option<String>,
    name: Option<String>,
}
