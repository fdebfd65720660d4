//! Provider capability interface
//!
//! One implementation per provider lives in the infrastructure layer. The
//! orchestrator and the webhook ingestor only ever see this trait.

use async_trait::async_trait;
use relaygate_domain::{
    AccountIdentity, AuthorizationHints, GatewayError, Integration, ProviderType, Result, TokenSet,
};

/// Tokens obtained from a code or installation exchange.
///
/// `identity` is set when the exchange response already names the account
/// (Slack, GitHub App installations); otherwise the orchestrator calls
/// [`ProviderAdapter::fetch_identity`].
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub tokens: TokenSet,
    pub identity: Option<AccountIdentity>,
    /// Provider-issued secret for signing this integration's webhooks.
    pub webhook_secret: Option<String>,
}

impl TokenGrant {
    pub fn new(tokens: TokenSet) -> Self {
        Self { tokens, identity: None, webhook_secret: None }
    }

    pub fn with_identity(mut self, identity: AccountIdentity) -> Self {
        self.identity = Some(identity);
        self
    }
}

/// Signature-related request headers, already extracted by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHeaders {
    /// `linear-signature`, `x-hub-signature-256` or `x-slack-signature`.
    pub signature: Option<String>,
    /// `x-slack-request-timestamp`.
    pub timestamp: Option<String>,
}

impl SignatureHeaders {
    pub fn new(signature: Option<String>) -> Self {
        Self { signature, timestamp: None }
    }

    pub fn with_timestamp(mut self, timestamp: Option<String>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Raise `Configuration` when the OAuth client is not set up.
    /// Must not touch the network.
    fn ensure_configured(&self) -> Result<()>;

    /// Configured scopes, or the provider defaults.
    fn scopes(&self) -> Vec<String>;

    fn build_authorization_url(
        &self,
        state: &str,
        scopes: &[String],
        redirect_uri: &str,
        hints: &AuthorizationHints,
    ) -> Result<String>;

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant>;

    /// Installation-based flows (GitHub App). Everyone else has no such path.
    async fn exchange_installation(&self, installation_id: &str) -> Result<TokenGrant> {
        let _ = installation_id;
        Err(GatewayError::InvalidInput(format!(
            "{} does not support installation callbacks",
            self.provider_type().slug()
        )))
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<AccountIdentity>;

    /// Constant-time signature check over the exact raw body.
    fn verify_webhook_signature(
        &self,
        raw_body: &[u8],
        headers: &SignatureHeaders,
        secret: &str,
    ) -> bool;

    /// New tokens for `integration`, or `None` when its tokens do not expire.
    async fn refresh_tokens(
        &self,
        integration: &Integration,
        refresh_token: Option<&str>,
    ) -> Result<Option<TokenSet>> {
        let _ = (integration, refresh_token);
        Ok(None)
    }

    /// Best-effort upstream revocation before an integration is deleted.
    async fn revoke_token(&self, integration: &Integration, access_token: &str) -> Result<()> {
        let _ = (integration, access_token);
        Ok(())
    }
}
