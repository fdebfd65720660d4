//! Slack OAuth v2 adapter
//!
//! `oauth.v2.access` answers HTTP 200 even on failure; the `ok` flag is the
//! real status. The exchange response already names the workspace, so no
//! separate identity call is needed after a code exchange.

use std::sync::Arc;

use async_trait::async_trait;
use relaygate_common::{verify_hmac_sha256_hex, Clock};
use relaygate_core::{ProviderAdapter, SignatureHeaders, TokenGrant};
use relaygate_domain::constants::{
    SLACK_DEFAULT_SCOPES, SLACK_MAX_REQUEST_AGE_SECS, SLACK_SIGNATURE_VERSION,
};
use relaygate_domain::{
    AccountIdentity, AuthorizationHints, ClientCredentials, GatewayError, Integration,
    ProviderType, Result, SlackConfig, TokenSet,
};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{expires_at, read_json, required, scopes_or_default, ScopeField};
use crate::http::HttpClient;

const PROVIDER: ProviderType = ProviderType::Slack;

#[derive(Debug, Clone)]
pub struct SlackEndpoints {
    pub authorize_url: String,
    /// Base for Web API methods (`oauth.v2.access`, `auth.test`, ...).
    pub api_base: String,
}

impl Default for SlackEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://slack.com/oauth/v2/authorize".into(),
            api_base: "https://slack.com/api".into(),
        }
    }
}

pub struct SlackAdapter {
    config: SlackConfig,
    http: HttpClient,
    clock: Arc<dyn Clock>,
    endpoints: SlackEndpoints,
}

impl SlackAdapter {
    pub fn new(config: SlackConfig, http: HttpClient, clock: Arc<dyn Clock>) -> Self {
        Self { config, http, clock, endpoints: SlackEndpoints::default() }
    }

    pub fn with_endpoints(mut self, endpoints: SlackEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn credentials(&self) -> Result<ClientCredentials> {
        self.config.credentials()
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.endpoints.api_base.trim_end_matches('/'))
    }

    /// Timestamp within the replay window of the gateway clock.
    fn timestamp_is_fresh(&self, timestamp: &str) -> bool {
        match timestamp.trim().parse::<i64>() {
            Ok(sent) => self
                .clock
                .unix_seconds()
                .checked_sub(sent)
                .map(i64::unsigned_abs)
                .is_some_and(|age| age <= SLACK_MAX_REQUEST_AGE_SECS.unsigned_abs()),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ProviderAdapter for SlackAdapter {
    fn provider_type(&self) -> ProviderType {
        PROVIDER
    }

    fn ensure_configured(&self) -> Result<()> {
        self.credentials().map(|_| ())
    }

    fn scopes(&self) -> Vec<String> {
        scopes_or_default(&self.config.scopes, SLACK_DEFAULT_SCOPES)
    }

    fn build_authorization_url(
        &self,
        state: &str,
        scopes: &[String],
        redirect_uri: &str,
        hints: &AuthorizationHints,
    ) -> Result<String> {
        let credentials = self.credentials()?;
        let scope = scopes.join(",");
        let mut params = vec![
            ("client_id", credentials.client_id.as_str()),
            ("scope", scope.as_str()),
            ("redirect_uri", redirect_uri),
            ("state", state),
        ];
        if let Some(team) = hints.team.as_deref() {
            params.push(("team", team));
        }

        let url = Url::parse_with_params(&self.endpoints.authorize_url, &params)
            .map_err(|e| GatewayError::Configuration(format!("invalid slack authorize url: {e}")))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
        let credentials = self.credentials()?;
        let request = self
            .http
            .post(self.method_url("oauth.v2.access"))
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("code", code), ("redirect_uri", redirect_uri)]);
        let response = self.http.send(request).await?;
        let body: AccessResponse = read_json(response, PROVIDER, "token_exchange").await?;
        let body = body.into_ok("token_exchange")?;

        let team = body.team.unwrap_or_default();
        let team_id = required(team.id, PROVIDER, "team.id")?;
        let user_id = body.authed_user.and_then(|user| user.id);
        let identity = AccountIdentity {
            external_account_id: user_id.unwrap_or_else(|| team_id.clone()),
            external_account_name: team.name.clone().unwrap_or_else(|| team_id.clone()),
            external_organization_id: Some(team_id),
            external_organization_name: team.name,
        };

        let access_token = required(body.access_token, PROVIDER, "access_token")?;
        let tokens = TokenSet::bearer(access_token)
            .with_refresh_token(body.refresh_token)
            .with_expires_at(expires_at(self.clock.now(), body.expires_in))
            .with_scopes(body.scope.into_vec());

        debug!(provider = PROVIDER.slug(), team = %identity.external_account_name, "provider.code_exchanged");
        Ok(TokenGrant::new(tokens).with_identity(identity))
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<AccountIdentity> {
        let request = self.http.post(self.method_url("auth.test")).bearer_auth(access_token);
        let response = self.http.send(request).await?;
        let body: AuthTestResponse = read_json(response, PROVIDER, "auth_test").await?;
        if !body.ok {
            return Err(slack_error("auth_test", body.error));
        }

        let team_id = required(body.team_id, PROVIDER, "team_id")?;
        Ok(AccountIdentity {
            external_account_id: body.user_id.unwrap_or_else(|| team_id.clone()),
            external_account_name: body.team.clone().unwrap_or_else(|| team_id.clone()),
            external_organization_id: Some(team_id),
            external_organization_name: body.team,
        })
    }

    fn verify_webhook_signature(
        &self,
        raw_body: &[u8],
        headers: &SignatureHeaders,
        secret: &str,
    ) -> bool {
        let (Some(signature), Some(timestamp)) =
            (headers.signature.as_deref(), headers.timestamp.as_deref())
        else {
            return false;
        };
        if !self.timestamp_is_fresh(timestamp) {
            warn!(provider = PROVIDER.slug(), "webhook.stale_timestamp");
            return false;
        }
        let prefix = format!("{SLACK_SIGNATURE_VERSION}=");
        let Some(provided) = signature.trim().strip_prefix(prefix.as_str()) else {
            return false;
        };

        let mut basestring =
            format!("{SLACK_SIGNATURE_VERSION}:{}:", timestamp.trim()).into_bytes();
        basestring.extend_from_slice(raw_body);
        verify_hmac_sha256_hex(secret.as_bytes(), &basestring, provided)
    }

    async fn refresh_tokens(
        &self,
        _integration: &Integration,
        refresh_token: Option<&str>,
    ) -> Result<Option<TokenSet>> {
        // Only workspaces with token rotation enabled hand out refresh tokens.
        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };
        let credentials = self.credentials()?;
        let request = self.http.post(self.method_url("oauth.v2.access")).form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ]);
        let response = self.http.send(request).await?;
        let body: AccessResponse = read_json(response, PROVIDER, "token_refresh").await?;
        let body = body.into_ok("token_refresh")?;

        let access_token = required(body.access_token, PROVIDER, "access_token")?;
        Ok(Some(
            TokenSet::bearer(access_token)
                .with_refresh_token(body.refresh_token.or_else(|| Some(refresh_token.to_string())))
                .with_expires_at(expires_at(self.clock.now(), body.expires_in))
                .with_scopes(body.scope.into_vec()),
        ))
    }

    async fn revoke_token(&self, _integration: &Integration, access_token: &str) -> Result<()> {
        let request = self.http.post(self.method_url("auth.revoke")).bearer_auth(access_token);
        let response = self.http.send(request).await?;
        let body: RevokeResponse =
            read_json(response, PROVIDER, "revoke").await.map_err(|err| match err {
                GatewayError::OAuthExchange(message) => GatewayError::Network(message),
                other => other,
            })?;
        if body.ok {
            Ok(())
        } else {
            Err(GatewayError::Network(format!(
                "slack revoke failed: {}",
                body.error.as_deref().unwrap_or("unknown_error")
            )))
        }
    }
}

fn slack_error(operation: &str, error: Option<String>) -> GatewayError {
    GatewayError::OAuthExchange(format!(
        "slack {operation} failed: {}",
        error.as_deref().unwrap_or("unknown_error")
    ))
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: ScopeField,
    #[serde(default)]
    team: Option<Team>,
    #[serde(default)]
    authed_user: Option<AuthedUser>,
}

impl AccessResponse {
    fn into_ok(self, operation: &str) -> Result<Self> {
        if self.ok {
            Ok(self)
        } else {
            Err(slack_error(operation, self.error))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Team {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthedUser {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    team_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RevokeResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}
