//! Scriptable provider adapter

use async_trait::async_trait;
use parking_lot::Mutex;
use relaygate_common::verify_hmac_sha256_hex;
use relaygate_core::{ProviderAdapter, SignatureHeaders, TokenGrant};
use relaygate_domain::{
    AccountIdentity, AuthorizationHints, GatewayError, Integration, ProviderType,
    Result as DomainResult, TokenSet,
};

pub struct FakeAdapter {
    provider: ProviderType,
    configured: bool,
    identity_in_grant: bool,
    fail_exchange: bool,
    fail_identity: bool,
    refresh_result: Mutex<Option<DomainResult<Option<TokenSet>>>>,
    fail_revoke: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeAdapter {
    pub fn new(provider: ProviderType) -> Self {
        Self {
            provider,
            configured: true,
            identity_in_grant: false,
            fail_exchange: false,
            fail_identity: false,
            refresh_result: Mutex::new(None),
            fail_revoke: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Exchange response already carries identity (Slack-style).
    pub fn identity_in_grant(mut self) -> Self {
        self.identity_in_grant = true;
        self
    }

    pub fn failing_exchange(mut self) -> Self {
        self.fail_exchange = true;
        self
    }

    pub fn failing_identity(mut self) -> Self {
        self.fail_identity = true;
        self
    }

    pub fn failing_revoke(mut self) -> Self {
        self.fail_revoke = true;
        self
    }

    pub fn with_refresh_result(self, result: DomainResult<Option<TokenSet>>) -> Self {
        *self.refresh_result.lock() = Some(result);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn identity(&self) -> AccountIdentity {
        AccountIdentity {
            external_account_id: format!("{}-user-1", self.provider.slug()),
            external_account_name: "Ada Lovelace".into(),
            external_organization_id: Some(format!("{}-org-1", self.provider.slug())),
            external_organization_name: Some("Analytical Engines".into()),
        }
    }
}

#[async_trait]
impl ProviderAdapter for FakeAdapter {
    fn provider_type(&self) -> ProviderType {
        self.provider
    }

    fn ensure_configured(&self) -> DomainResult<()> {
        if self.configured {
            Ok(())
        } else {
            Err(GatewayError::Configuration(format!("{} not configured", self.provider.slug())))
        }
    }

    fn scopes(&self) -> Vec<String> {
        vec!["read".into()]
    }

    fn build_authorization_url(
        &self,
        state: &str,
        scopes: &[String],
        redirect_uri: &str,
        hints: &AuthorizationHints,
    ) -> DomainResult<String> {
        self.ensure_configured()?;
        let mut url = format!(
            "https://{}.example/authorize?state={state}&scope={}&redirect_uri={redirect_uri}",
            self.provider.slug(),
            scopes.join(",")
        );
        if let Some(team) = &hints.team {
            url.push_str(&format!("&team={team}"));
        }
        Ok(url)
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> DomainResult<TokenGrant> {
        self.record(format!("exchange_code:{code}:{redirect_uri}"));
        if self.fail_exchange {
            return Err(GatewayError::OAuthExchange("upstream returned 400".into()));
        }
        let grant = TokenGrant::new(
            TokenSet::bearer(format!("access-{code}"))
                .with_refresh_token(Some(format!("refresh-{code}")))
                .with_scopes(vec!["read".into()]),
        );
        Ok(if self.identity_in_grant { grant.with_identity(self.identity()) } else { grant })
    }

    async fn exchange_installation(&self, installation_id: &str) -> DomainResult<TokenGrant> {
        self.record(format!("exchange_installation:{installation_id}"));
        if self.provider != ProviderType::Github {
            return Err(GatewayError::InvalidInput("no installations".into()));
        }
        Ok(TokenGrant::new(TokenSet::bearer("ghs_installation").with_token_type("token"))
            .with_identity(AccountIdentity {
                external_account_id: installation_id.to_string(),
                external_account_name: "octo-org".into(),
                external_organization_id: Some("9001".into()),
                external_organization_name: Some("octo-org".into()),
            }))
    }

    async fn fetch_identity(&self, access_token: &str) -> DomainResult<AccountIdentity> {
        self.record(format!("fetch_identity:{access_token}"));
        if self.fail_identity {
            return Err(GatewayError::OAuthExchange("viewer query failed".into()));
        }
        Ok(self.identity())
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
            .is_some_and(|sig| verify_hmac_sha256_hex(secret.as_bytes(), raw_body, sig))
    }

    async fn refresh_tokens(
        &self,
        _integration: &Integration,
        refresh_token: Option<&str>,
    ) -> DomainResult<Option<TokenSet>> {
        self.record(format!("refresh:{}", refresh_token.unwrap_or("-")));
        self.refresh_result.lock().take().unwrap_or(Ok(None))
    }

    async fn revoke_token(&self, _integration: &Integration, access_token: &str) -> DomainResult<()> {
        self.record(format!("revoke:{access_token}"));
        if self.fail_revoke {
            return Err(GatewayError::Network("revoke endpoint down".into()));
        }
        Ok(())
    }
}
