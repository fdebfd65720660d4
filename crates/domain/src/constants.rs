//! Gateway constants
//!
//! Centralized location for domain-level limits and defaults.

// OAuth state
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;
pub const OAUTH_STATE_PURGE_INTERVAL_SECS: u64 = 300;

// GitHub App
pub const GITHUB_APP_JWT_TTL_SECS: i64 = 540;
pub const GITHUB_APP_JWT_BACKDATE_SECS: i64 = 60;
pub const GITHUB_INSTALLATION_TOKEN_PREFIX: &str = "ghs_";

// Slack request signing
pub const SLACK_SIGNATURE_VERSION: &str = "v0";
pub const SLACK_MAX_REQUEST_AGE_SECS: i64 = 300;

// Token refresh
pub const TOKEN_REFRESH_SKEW_SECS: i64 = 120;

// Default scopes requested when the caller does not supply any
pub const LINEAR_DEFAULT_SCOPES: &[&str] = &["read", "write"];
pub const SLACK_DEFAULT_SCOPES: &[&str] =
    &["channels:history", "channels:read", "chat:write", "team:read", "users:read"];
pub const GOOGLE_DEFAULT_SCOPES: &[&str] = &[
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/calendar.readonly",
];
pub const GITHUB_DEFAULT_SCOPES: &[&str] = &["repo", "read:org", "read:user", "user:email"];

// HTTP
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_DB_PATH: &str = "data/relaygate.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 8;
pub const USER_AGENT: &str = concat!("relaygate/", env!("CARGO_PKG_VERSION"));
