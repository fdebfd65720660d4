//! Configuration management
//!
//! Secret-bearing sections implement `Debug` by hand so that client secrets,
//! signing secrets, private keys and the vault key never reach a log line.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BIND_ADDRESS, DEFAULT_DB_PATH, DEFAULT_DB_POOL_SIZE};
use crate::errors::{GatewayError, Result};
use crate::types::ProviderType;

const REDACTED: &str = "[REDACTED]";

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| REDACTED)
}

/// OAuth callback URL for `provider` under `app_url`.
pub fn callback_url(app_url: &str, provider: ProviderType) -> String {
    format!("{}/integrations/oauth/{}/callback", app_url.trim_end_matches('/'), provider.slug())
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Public base URL used to build OAuth callback URLs.
    pub app_url: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl GatewayConfig {
    /// Callback URL registered with the provider.
    pub fn callback_url(&self, provider: ProviderType) -> String {
        callback_url(&self.app_url, provider)
    }

    /// Landing page when a flow has no stored redirect URL.
    pub fn default_redirect_url(&self) -> String {
        format!("{}/integrations", self.app_url.trim_end_matches('/'))
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:8080".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            vault: VaultConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: DEFAULT_BIND_ADDRESS.to_string() }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_PATH.to_string(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Emit JSON lines instead of the human format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Credential vault configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    /// 32-byte key, hex or base64 encoded.
    #[serde(skip_serializing)]
    pub encryption_key: Option<String>,
}

impl VaultConfig {
    /// The configured key. There is no fallback: a missing key is fatal.
    pub fn require_key(&self) -> Result<&str> {
        self.encryption_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::Configuration("vault encryption key is not configured".to_string())
            })
    }
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig").field("encryption_key", &redact(&self.encryption_key)).finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub linear: LinearConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub github: GitHubConfig,
}

/// OAuth client credentials, present only when both halves are set.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .finish()
    }
}

fn credentials_for(
    provider: ProviderType,
    client_id: &Option<String>,
    client_secret: &Option<String>,
) -> Result<ClientCredentials> {
    match (non_empty(client_id), non_empty(client_secret)) {
        (Some(client_id), Some(client_secret)) => Ok(ClientCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }),
        _ => Err(GatewayError::Configuration(format!(
            "{} client credentials are not configured",
            provider.slug()
        ))),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LinearConfig {
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    /// Global secret shared by every Linear webhook.
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl LinearConfig {
    pub fn credentials(&self) -> Result<ClientCredentials> {
        credentials_for(ProviderType::Linear, &self.client_id, &self.client_secret)
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        non_empty(&self.webhook_secret)
    }
}

impl fmt::Debug for LinearConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    #[serde(skip_serializing)]
    pub signing_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl SlackConfig {
    pub fn credentials(&self) -> Result<ClientCredentials> {
        credentials_for(ProviderType::Slack, &self.client_id, &self.client_secret)
    }

    pub fn signing_secret(&self) -> Option<&str> {
        non_empty(&self.signing_secret)
    }
}

impl fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("signing_secret", &redact(&self.signing_secret))
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    pub fn credentials(&self) -> Result<ClientCredentials> {
        credentials_for(ProviderType::Google, &self.client_id, &self.client_secret)
    }
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// GitHub App credentials, present only when id, slug and key are all set.
#[derive(Clone)]
pub struct GitHubAppCredentials {
    pub app_id: String,
    pub slug: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
}

impl fmt::Debug for GitHubAppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubAppCredentials")
            .field("app_id", &self.app_id)
            .field("slug", &self.slug)
            .field("private_key", &REDACTED)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub app_id: Option<String>,
    pub app_slug: Option<String>,
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl GitHubConfig {
    pub fn credentials(&self) -> Result<ClientCredentials> {
        credentials_for(ProviderType::Github, &self.client_id, &self.client_secret)
    }

    /// App credentials when the installation flow is configured.
    pub fn app(&self) -> Option<GitHubAppCredentials> {
        Some(GitHubAppCredentials {
            app_id: non_empty(&self.app_id)?.to_string(),
            slug: non_empty(&self.app_slug)?.to_string(),
            // Env-sourced keys often carry literal `\n` sequences.
            private_key: non_empty(&self.private_key)?.replace("\\n", "\n"),
        })
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        non_empty(&self.webhook_secret)
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("app_id", &self.app_id)
            .field("app_slug", &self.app_slug)
            .field("private_key", &redact(&self.private_key))
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("scopes", &self.scopes)
            .finish()
    }
}
