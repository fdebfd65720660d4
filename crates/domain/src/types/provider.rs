//! Provider identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;

/// Third-party provider an integration connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderType {
    Linear,
    Slack,
    Github,
    Google,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [Self::Linear, Self::Slack, Self::Github, Self::Google];

    /// Storage form (`LINEAR`, `SLACK`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "LINEAR",
            Self::Slack => "SLACK",
            Self::Github => "GITHUB",
            Self::Google => "GOOGLE",
        }
    }

    /// URL path segment (`linear`, `slack`, ...).
    pub fn slug(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Slack => "slack",
            Self::Github => "github",
            Self::Google => "google",
        }
    }

    /// Whether the provider signs inbound webhooks.
    pub fn supports_webhooks(self) -> bool {
        !matches!(self, Self::Google)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "slack" => Ok(Self::Slack),
            "github" => Ok(Self::Github),
            "google" => Ok(Self::Google),
            other => Err(GatewayError::InvalidInput(format!("unknown provider: {other}"))),
        }
    }
}
