//! OAuth state manager

use std::sync::Arc;

use chrono::Duration;
use relaygate_common::{generate_state_token, Clock, SystemClock};
use relaygate_domain::constants::OAUTH_STATE_TTL_MINUTES;
use relaygate_domain::{GatewayError, OAuthState, ProviderType, Result};
use tracing::{debug, warn};

use super::ports::OAuthStateStore;

/// Issues and redeems single-use CSRF states.
pub struct StateManager {
    store: Arc<dyn OAuthStateStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl StateManager {
    pub fn new(store: Arc<dyn OAuthStateStore>) -> Self {
        Self { store, clock: Arc::new(SystemClock), ttl: Duration::minutes(OAUTH_STATE_TTL_MINUTES) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a state bound to the caller, provider and redirect target.
    pub async fn issue(
        &self,
        workspace_id: &str,
        user_id: &str,
        provider_type: ProviderType,
        redirect_url: Option<String>,
    ) -> Result<OAuthState> {
        let created_at = self.clock.now();
        let state = OAuthState {
            state: generate_state_token(),
            nonce: generate_state_token(),
            workspace_id: workspace_id.to_string(),
            user_id: user_id.to_string(),
            provider_type,
            redirect_url,
            created_at,
            expires_at: created_at + self.ttl,
            consumed: false,
        };

        self.store.insert(state.clone()).await?;
        debug!(
            provider = %provider_type,
            workspace_id,
            expires_at = %state.expires_at,
            "oauth.state.issued"
        );
        Ok(state)
    }

    /// Redeem `state`. Unknown, expired and already-consumed states all fail
    /// with [`GatewayError::InvalidState`].
    pub async fn validate_and_consume(&self, state: &str) -> Result<OAuthState> {
        if state.trim().is_empty() {
            return Err(GatewayError::InvalidState("state is empty".to_string()));
        }

        match self.store.consume(state, self.clock.now()).await? {
            Some(record) => Ok(record),
            None => {
                warn!("oauth.state.rejected");
                Err(GatewayError::InvalidState(
                    "state is unknown, expired or already used".to_string(),
                ))
            }
        }
    }

    pub async fn purge_expired(&self) -> Result<usize> {
        let purged = self.store.purge_expired(self.clock.now()).await?;
        if purged > 0 {
            debug!(purged, "oauth.state.purged");
        }
        Ok(purged)
    }
}
