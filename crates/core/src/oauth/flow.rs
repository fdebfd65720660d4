//! Authorization flow stages and failures

use std::fmt;

use relaygate_domain::GatewayError;

/// Where a flow stood when it finished.
///
/// `InitRequested -> StateIssued` happens on init; a callback walks
/// `CallbackReceived -> TokensExchanged -> IdentityFetched -> IntegrationPersisted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    InitRequested,
    StateIssued,
    CallbackReceived,
    TokensExchanged,
    IdentityFetched,
    IntegrationPersisted,
}

impl FlowStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitRequested => "init_requested",
            Self::StateIssued => "state_issued",
            Self::CallbackReceived => "callback_received",
            Self::TokensExchanged => "tokens_exchanged",
            Self::IdentityFetched => "identity_fetched",
            Self::IntegrationPersisted => "integration_persisted",
        }
    }
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal `FAILED(reason)` state of a callback.
///
/// `code` is safe to put in a redirect URL; `message` is short and carries no
/// upstream bodies or secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowFailure {
    pub stage: FlowStage,
    pub code: String,
    pub message: String,
    /// Redirect target recovered from the consumed state, if we got that far.
    pub redirect_url: Option<String>,
}

impl FlowFailure {
    pub fn from_error(stage: FlowStage, error: &GatewayError, redirect_url: Option<String>) -> Self {
        Self { stage, code: error.code().to_string(), message: public_message(error), redirect_url }
    }

    /// Error forwarded by the provider (`access_denied`, ...).
    pub fn provider_error(
        code: &str,
        description: Option<&str>,
        redirect_url: Option<String>,
    ) -> Self {
        Self {
            stage: FlowStage::CallbackReceived,
            code: sanitize_code(code),
            message: description
                .map(|d| d.chars().take(200).collect())
                .unwrap_or_else(|| "authorization was not granted".to_string()),
            redirect_url,
        }
    }
}

impl fmt::Display for FlowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.code, self.stage, self.message)
    }
}

impl std::error::Error for FlowFailure {}

fn public_message(error: &GatewayError) -> String {
    match error {
        GatewayError::InvalidState(_) => "authorization state is invalid or expired",
        GatewayError::Configuration(_) => "provider is not configured",
        GatewayError::OAuthExchange(_) | GatewayError::Network(_) => {
            "could not complete authorization with the provider"
        }
        GatewayError::InvalidInput(_) => "callback is missing required parameters",
        _ => "integration could not be saved",
    }
    .to_string()
}

/// Keep provider error codes to a conservative charset.
fn sanitize_code(code: &str) -> String {
    let cleaned: String = code
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "oauth_failed".to_string()
    } else {
        cleaned
    }
}
