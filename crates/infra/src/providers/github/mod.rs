//! GitHub adapter
//!
//! Two flows share one provider type:
//! - GitHub App installation (preferred when App credentials are set): the
//!   callback carries `installation_id` and tokens are minted with an App JWT.
//! - Classic OAuth App: `code` exchange for a user token.
//!
//! Stored `token_type` tells them apart later (`token` for installations).

mod app;
mod jwt;
mod oauth;

use std::sync::Arc;

use async_trait::async_trait;
use relaygate_common::{verify_hmac_sha256_hex, Clock};
use relaygate_core::{classify_github_token, GitHubTokenKind, ProviderAdapter, SignatureHeaders, TokenGrant};
use relaygate_domain::constants::GITHUB_DEFAULT_SCOPES;
use relaygate_domain::{
    AccountIdentity, AuthorizationHints, GatewayError, GitHubAppCredentials, GitHubConfig,
    Integration, ProviderType, Result, TokenSet,
};
use reqwest::RequestBuilder;
use tracing::debug;
use url::Url;

use super::scopes_or_default;
use crate::http::HttpClient;

pub(crate) const PROVIDER: ProviderType = ProviderType::Github;
const API_VERSION: &str = "2022-11-28";
const SIGNATURE_PREFIX: &str = "sha256=";

/// Stored token type for installation access tokens.
pub const INSTALLATION_TOKEN_TYPE: &str = "token";

#[derive(Debug, Clone)]
pub struct GitHubEndpoints {
    /// `https://github.com` (authorize, token exchange, App install page).
    pub web_base: String,
    /// `https://api.github.com`.
    pub api_base: String,
}

impl Default for GitHubEndpoints {
    fn default() -> Self {
        Self { web_base: "https://github.com".into(), api_base: "https://api.github.com".into() }
    }
}

pub struct GitHubAdapter {
    config: GitHubConfig,
    app: Option<GitHubAppCredentials>,
    http: HttpClient,
    clock: Arc<dyn Clock>,
    endpoints: GitHubEndpoints,
}

impl GitHubAdapter {
    pub fn new(config: GitHubConfig, http: HttpClient, clock: Arc<dyn Clock>) -> Self {
        let app = config.app();
        Self { config, app, http, clock, endpoints: GitHubEndpoints::default() }
    }

    pub fn with_endpoints(mut self, endpoints: GitHubEndpoints) -> Self {
        self.endpoints = GitHubEndpoints {
            web_base: endpoints.web_base.trim_end_matches('/').to_string(),
            api_base: endpoints.api_base.trim_end_matches('/').to_string(),
        };
        self
    }

    /// Whether authorization goes through the App installation page.
    pub fn uses_app_installation(&self) -> bool {
        self.app.is_some()
    }
}

pub(crate) fn github_headers(builder: RequestBuilder) -> RequestBuilder {
    builder
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .header("X-GitHub-Api-Version", API_VERSION)
}

#[async_trait]
impl ProviderAdapter for GitHubAdapter {
    fn provider_type(&self) -> ProviderType {
        PROVIDER
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.app.is_some() {
            return Ok(());
        }
        self.config.credentials().map(|_| ())
    }

    fn scopes(&self) -> Vec<String> {
        scopes_or_default(&self.config.scopes, GITHUB_DEFAULT_SCOPES)
    }

    fn build_authorization_url(
        &self,
        state: &str,
        scopes: &[String],
        redirect_uri: &str,
        _hints: &AuthorizationHints,
    ) -> Result<String> {
        let invalid = |e: url::ParseError| {
            GatewayError::Configuration(format!("invalid github authorize url: {e}"))
        };

        if let Some(app) = &self.app {
            // Permissions come from the App registration, not from scopes.
            let base = format!(
                "{}/apps/{}/installations/new",
                self.endpoints.web_base,
                urlencoding::encode(&app.slug)
            );
            return Url::parse_with_params(&base, &[("state", state)]).map(Into::into).map_err(invalid);
        }

        let credentials = self.config.credentials()?;
        let scope = scopes.join(" ");
        let base = format!("{}/login/oauth/authorize", self.endpoints.web_base);
        Url::parse_with_params(
            &base,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("state", state),
                ("allow_signup", "true"),
            ],
        )
        .map(Into::into)
        .map_err(invalid)
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant> {
        let credentials = self.config.credentials()?;
        let tokens = self
            .user_token_request(
                &[
                    ("client_id", credentials.client_id.as_str()),
                    ("client_secret", credentials.client_secret.as_str()),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                ],
                "token_exchange",
            )
            .await?;
        Ok(TokenGrant::new(tokens))
    }

    async fn exchange_installation(&self, installation_id: &str) -> Result<TokenGrant> {
        let installation_id = installation_id.trim();
        if installation_id.is_empty() || !installation_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(GatewayError::InvalidInput("installation_id must be numeric".into()));
        }

        let tokens = self.mint_installation_token(installation_id).await?;
        let identity = self.installation_identity(installation_id).await?;
        debug!(provider = PROVIDER.slug(), account = %identity.external_account_name, "provider.installation_exchanged");
        Ok(TokenGrant::new(tokens).with_identity(identity))
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<AccountIdentity> {
        self.user_identity(access_token).await
    }

    fn verify_webhook_signature(
        &self,
        raw_body: &[u8],
        headers: &SignatureHeaders,
        secret: &str,
    ) -> bool {
        headers
            .signature
            .as_deref()
            .and_then(|sig| sig.trim().strip_prefix(SIGNATURE_PREFIX))
            .is_some_and(|hex| verify_hmac_sha256_hex(secret.as_bytes(), raw_body, hex))
    }

    async fn refresh_tokens(
        &self,
        integration: &Integration,
        refresh_token: Option<&str>,
    ) -> Result<Option<TokenSet>> {
        if integration.token_type == INSTALLATION_TOKEN_TYPE {
            // The installation id doubles as the external account id.
            let tokens = self.mint_installation_token(&integration.external_account_id).await?;
            return Ok(Some(tokens));
        }

        // Classic OAuth tokens only expire when token expiration is enabled.
        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };
        let credentials = self.config.credentials()?;
        let mut tokens = self
            .user_token_request(
                &[
                    ("client_id", credentials.client_id.as_str()),
                    ("client_secret", credentials.client_secret.as_str()),
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
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
        match classify_github_token(access_token) {
            GitHubTokenKind::InstallationToken => self.revoke_installation_token(access_token).await,
            GitHubTokenKind::UserToken => self.revoke_user_token(access_token).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use relaygate_common::{hmac_sha256_hex, MockClock};
    use relaygate_domain::IntegrationStatus;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const TEST_KEY: &str = include_str!("../../../tests/fixtures/github_app_test_key.pem");

    fn oauth_config() -> GitHubConfig {
        GitHubConfig {
            client_id: Some("Iv1.client".into()),
            client_secret: Some("gh-secret".into()),
            webhook_secret: Some("gh-webhook".into()),
            ..GitHubConfig::default()
        }
    }

    fn app_config() -> GitHubConfig {
        GitHubConfig {
            app_id: Some("4242".into()),
            app_slug: Some("relaygate-test".into()),
            private_key: Some(TEST_KEY.into()),
            ..oauth_config()
        }
    }

    fn adapter(config: GitHubConfig, server: &MockServer) -> GitHubAdapter {
        let http = HttpClient::builder().max_attempts(1).build().expect("http client");
        GitHubAdapter::new(config, http, Arc::new(MockClock::new())).with_endpoints(
            GitHubEndpoints { web_base: server.uri(), api_base: format!("{}/api", server.uri()) },
        )
    }

    fn integration(token_type: &str) -> Integration {
        let now = Utc::now();
        Integration {
            id: "int-gh".into(),
            workspace_id: "W1".into(),
            provider_type: ProviderType::Github,
            status: IntegrationStatus::Active,
            external_account_id: "777".into(),
            external_account_name: Some("acme".into()),
            external_organization_id: Some("99".into()),
            external_organization_name: Some("acme".into()),
            scopes: Default::default(),
            access_token: String::new(),
            refresh_token: None,
            token_type: token_type.into(),
            token_expires_at: None,
            webhook_secret: None,
            created_by: "U1".into(),
            created_at: now,
            updated_at: now,
            last_sync_at: None,
        }
    }

    fn query(url: &str) -> HashMap<String, String> {
        Url::parse(url).expect("parse").query_pairs().into_owned().collect()
    }

    #[tokio::test]
    async fn app_flow_points_at_installation_page() {
        let server = MockServer::start().await;
        let adapter = adapter(app_config(), &server);
        assert!(adapter.uses_app_installation());

        let url = adapter
            .build_authorization_url("st", &adapter.scopes(), "https://gw.test/cb", &Default::default())
            .expect("url");
        assert!(url.contains("/apps/relaygate-test/installations/new"));
        assert_eq!(query(&url)["state"], "st");
        assert!(!query(&url).contains_key("client_id"));
    }

    #[tokio::test]
    async fn oauth_flow_uses_space_joined_scopes() {
        let server = MockServer::start().await;
        let adapter = adapter(oauth_config(), &server);
        let url = adapter
            .build_authorization_url("st", &adapter.scopes(), "https://gw.test/cb", &Default::default())
            .expect("url");
        let params = query(&url);
        assert!(url.contains("/login/oauth/authorize"));
        assert_eq!(params["client_id"], "Iv1.client");
        assert_eq!(params["scope"], "repo read:org read:user user:email");
    }

    #[test]
    fn nothing_configured_is_a_configuration_error() {
        let http = HttpClient::new().expect("http client");
        let adapter = GitHubAdapter::new(GitHubConfig::default(), http, Arc::new(MockClock::new()));
        assert!(matches!(adapter.ensure_configured(), Err(GatewayError::Configuration(_))));
    }

    #[tokio::test]
    async fn installation_exchange_mints_token_and_reads_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/app/installations/777/access_tokens"))
            .and(header_exists("authorization"))
            .and(header("x-github-api-version", API_VERSION))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "token": "ghs_installation",
                "expires_at": "2030-01-01T00:00:00Z",
                "permissions": { "issues": "write", "metadata": "read" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/app/installations/777"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 777,
                "account": { "login": "acme", "id": 99, "type": "Organization" }
            })))
            .mount(&server)
            .await;

        let grant = adapter(app_config(), &server).exchange_installation("777").await.expect("grant");
        assert_eq!(grant.tokens.access_token, "ghs_installation");
        assert_eq!(grant.tokens.token_type, INSTALLATION_TOKEN_TYPE);
        assert_eq!(grant.tokens.scopes, ["issues:write", "metadata:read"]);
        assert!(grant.tokens.expires_at.is_some());

        let identity = grant.identity.expect("identity");
        assert_eq!(identity.external_account_id, "777");
        assert_eq!(identity.external_account_name, "acme");
        assert_eq!(identity.external_organization_id.as_deref(), Some("99"));
    }

    #[tokio::test]
    async fn non_numeric_installation_id_is_rejected() {
        let server = MockServer::start().await;
        let err = adapter(app_config(), &server)
            .exchange_installation("../app")
            .await
            .expect_err("invalid id");
        assert!(matches!(err, GatewayError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn code_exchange_surfaces_error_in_200_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=expired"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let err = adapter(oauth_config(), &server)
            .exchange_code("expired", "https://gw.test/cb")
            .await
            .expect_err("error body");
        assert!(matches!(err, GatewayError::OAuthExchange(msg) if msg.contains("bad_verification_code")));
    }

    #[tokio::test]
    async fn user_identity_uses_bearer_scheme() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_user", "token_type": "bearer", "scope": "repo,read:org"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/user"))
            .and(header("authorization", "Bearer gho_user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5, "login": "octocat"
            })))
            .mount(&server)
            .await;

        let adapter = adapter(oauth_config(), &server);
        let grant = adapter.exchange_code("c", "https://gw.test/cb").await.expect("grant");
        assert_eq!(grant.tokens.token_type, "Bearer");
        assert_eq!(grant.tokens.scopes, ["read:org", "repo"]);

        let identity = adapter.fetch_identity("gho_user").await.expect("identity");
        assert_eq!(identity.external_account_id, "5");
        assert_eq!(identity.external_account_name, "octocat");
    }

    #[tokio::test]
    async fn installation_tokens_cannot_fetch_user_identity() {
        let server = MockServer::start().await;
        let err = adapter(app_config(), &server)
            .fetch_identity("ghs_installation")
            .await
            .expect_err("installation token");
        assert!(matches!(err, GatewayError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn installation_integration_refresh_remints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/app/installations/777/access_tokens"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "token": "ghs_fresh", "expires_at": "2030-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter(app_config(), &server);
        let tokens = adapter
            .refresh_tokens(&integration(INSTALLATION_TOKEN_TYPE), None)
            .await
            .expect("refresh")
            .expect("tokens");
        assert_eq!(tokens.access_token, "ghs_fresh");

        let untouched = adapter.refresh_tokens(&integration("Bearer"), None).await.expect("refresh");
        assert!(untouched.is_none());
    }

    #[tokio::test]
    async fn revoke_routes_by_token_kind() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/installation/token"))
            .and(header("authorization", "token ghs_x"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/applications/Iv1.client/token"))
            .and(body_string_contains("gho_y"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter(app_config(), &server);
        adapter.revoke_token(&integration(INSTALLATION_TOKEN_TYPE), "ghs_x").await.expect("revoke");
        adapter.revoke_token(&integration("Bearer"), "gho_y").await.expect("revoke");
    }

    #[test]
    fn webhook_signature_requires_sha256_prefix() {
        let http = HttpClient::new().expect("http client");
        let adapter = GitHubAdapter::new(oauth_config(), http, Arc::new(MockClock::new()));
        let body = br#"{"action":"opened"}"#;
        let hex = hmac_sha256_hex(b"gh-webhook", body).expect("hmac");

        let signed = SignatureHeaders::new(Some(format!("sha256={hex}")));
        assert!(adapter.verify_webhook_signature(body, &signed, "gh-webhook"));
        assert!(!adapter.verify_webhook_signature(br#"{"action":"closed"}"#, &signed, "gh-webhook"));

        let bare = SignatureHeaders::new(Some(hex));
        assert!(!adapter.verify_webhook_signature(body, &bare, "gh-webhook"));
    }
}
