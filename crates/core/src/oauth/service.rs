//! OAuth orchestrator - drives init, callback, refresh and disconnect

use std::sync::Arc;

use relaygate_common::{Clock, SystemClock};
use relaygate_domain::{
    callback_url, AuthorizationHints, CallbackParams, CompletedFlow, DomainEvent, GatewayError,
    Integration, IntegrationConnected, IntegrationDisconnected, IntegrationStatus, NewIntegration,
    ProviderType, Result,
};
use tracing::{error, info, warn};

use super::flow::{FlowFailure, FlowStage};
use super::state::StateManager;
use crate::event_ports::EventPublisher;
use crate::integrations::IntegrationStore;
use crate::providers::{ProviderAdapter, ProviderRegistry, TokenGrant};

/// Request to start an authorization flow.
#[derive(Debug, Clone)]
pub struct InitRequest {
    pub workspace_id: String,
    pub user_id: String,
    pub provider_type: ProviderType,
    pub redirect_url: Option<String>,
    pub hints: AuthorizationHints,
}

/// Outcome of [`OAuthOrchestrator::disconnect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnected {
    pub integration_id: String,
    pub revoked_upstream: bool,
}

pub struct OAuthOrchestrator {
    registry: Arc<ProviderRegistry>,
    states: Arc<StateManager>,
    store: Arc<IntegrationStore>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    app_url: String,
}

impl OAuthOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        states: Arc<StateManager>,
        store: Arc<IntegrationStore>,
        publisher: Arc<dyn EventPublisher>,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            states,
            store,
            publisher,
            clock: Arc::new(SystemClock),
            app_url: app_url.into(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a state and build the provider authorization URL.
    ///
    /// Unconfigured providers fail before a state is stored.
    pub async fn init(&self, request: InitRequest) -> Result<String> {
        let provider = request.provider_type;
        let adapter = self.registry.get(provider)?;
        adapter.ensure_configured()?;

        let state = self
            .states
            .issue(&request.workspace_id, &request.user_id, provider, request.redirect_url)
            .await?;

        let url = adapter.build_authorization_url(
            &state.state,
            &adapter.scopes(),
            &callback_url(&self.app_url, provider),
            &request.hints,
        )?;

        info!(
            provider = %provider,
            workspace_id = %request.workspace_id,
            user_id = %request.user_id,
            stage = %FlowStage::StateIssued,
            "oauth.init"
        );
        Ok(url)
    }

    /// Redeem the state and turn the callback into an ACTIVE integration.
    ///
    /// The state is consumed before anything else happens, so it can never
    /// be replayed whatever the outcome. Nothing is persisted unless every
    /// prior step succeeded.
    pub async fn complete_callback(
        &self,
        provider: ProviderType,
        params: CallbackParams,
    ) -> std::result::Result<CompletedFlow, FlowFailure> {
        let stage = FlowStage::CallbackReceived;

        let Some(state_token) = params.state.as_deref().filter(|s| !s.is_empty()) else {
            // A provider error without state still deserves the provider's code.
            if let Some(code) = params.error.as_deref() {
                return Err(FlowFailure::provider_error(
                    code,
                    params.error_description.as_deref(),
                    None,
                ));
            }
            warn!(provider = %provider, "oauth.callback.missing_state");
            let err = GatewayError::InvalidInput("state is required".to_string());
            return Err(FlowFailure::from_error(stage, &err, None));
        };

        let state = match self.states.validate_and_consume(state_token).await {
            Ok(state) => state,
            Err(err) => {
                warn!(provider = %provider, error = %err, "oauth.callback.invalid_state");
                return Err(FlowFailure::from_error(stage, &err, None));
            }
        };
        let redirect_url = state.redirect_url.clone();

        if state.provider_type != provider {
            warn!(
                provider = %provider,
                state_provider = %state.provider_type,
                workspace_id = %state.workspace_id,
                "oauth.callback.invalid_state"
            );
            let err = GatewayError::InvalidState("state was issued for another provider".into());
            return Err(FlowFailure::from_error(stage, &err, redirect_url));
        }

        if let Some(code) = params.error.as_deref() {
            warn!(
                provider = %provider,
                workspace_id = %state.workspace_id,
                provider_error = code,
                "oauth.callback.provider_error"
            );
            return Err(FlowFailure::provider_error(
                code,
                params.error_description.as_deref(),
                redirect_url,
            ));
        }

        let result = self.finish_flow(provider, &params, &state.workspace_id, &state.user_id).await;
        match result {
            Ok((integration, reconnected)) => {
                self.publish_connected(&integration, &state.user_id).await;
                Ok(CompletedFlow { integration_id: integration.id, redirect_url, reconnected })
            }
            Err((stage, err)) => {
                error!(
                    provider = %provider,
                    workspace_id = %state.workspace_id,
                    stage = %stage,
                    error = %err,
                    "oauth.callback.failed"
                );
                Err(FlowFailure::from_error(stage, &err, redirect_url))
            }
        }
    }

    async fn finish_flow(
        &self,
        provider: ProviderType,
        params: &CallbackParams,
        workspace_id: &str,
        user_id: &str,
    ) -> std::result::Result<(Integration, bool), (FlowStage, GatewayError)> {
        let at = |stage: FlowStage| move |err: GatewayError| (stage, err);

        let adapter = self.registry.get(provider).map_err(at(FlowStage::CallbackReceived))?;
        let grant = self
            .exchange(adapter.as_ref(), provider, params)
            .await
            .map_err(at(FlowStage::CallbackReceived))?;

        let identity = match grant.identity {
            Some(identity) => identity,
            None => adapter
                .fetch_identity(&grant.tokens.access_token)
                .await
                .map_err(at(FlowStage::TokensExchanged))?,
        };
        if identity.external_account_id.trim().is_empty() {
            return Err((
                FlowStage::TokensExchanged,
                GatewayError::OAuthExchange("identity is missing an account id".to_string()),
            ));
        }

        let connected = self
            .store
            .connect(NewIntegration {
                workspace_id: workspace_id.to_string(),
                created_by: user_id.to_string(),
                provider_type: provider,
                status: IntegrationStatus::Active,
                identity,
                tokens: grant.tokens,
                webhook_secret: grant.webhook_secret,
            })
            .await
            .map_err(at(FlowStage::IdentityFetched))?;

        info!(
            integration_id = %connected.integration.id,
            workspace_id,
            provider = %provider,
            reconnected = connected.reconnected,
            stage = %FlowStage::IntegrationPersisted,
            "oauth.callback.completed"
        );
        Ok((connected.integration, connected.reconnected))
    }

    async fn exchange(
        &self,
        adapter: &dyn ProviderAdapter,
        provider: ProviderType,
        params: &CallbackParams,
    ) -> Result<TokenGrant> {
        if let Some(installation_id) = params.installation_id.as_deref().filter(|id| !id.is_empty())
        {
            return adapter.exchange_installation(installation_id).await;
        }

        if provider == ProviderType::Github && params.setup_action.as_deref() == Some("request") {
            return Err(GatewayError::InvalidInput(
                "installation is awaiting organization approval".to_string(),
            ));
        }

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| GatewayError::InvalidInput("code is required".to_string()))?;
        adapter.exchange_code(code, &callback_url(&self.app_url, provider)).await
    }

    /// Refresh an integration's tokens. Failure marks it `ERROR`.
    pub async fn refresh_integration(&self, integration_id: &str) -> Result<Integration> {
        let integration = self.store.get(integration_id).await?;
        if matches!(integration.status, IntegrationStatus::Revoked | IntegrationStatus::Expired) {
            warn!(
                integration_id,
                workspace_id = %integration.workspace_id,
                status = %integration.status,
                "integration.refresh_rejected"
            );
            return Err(GatewayError::InvalidInput(format!(
                "integration {integration_id} is {} and must be reconnected",
                integration.status
            )));
        }
        let adapter = self.registry.get(integration.provider_type)?;

        let refreshed = match self.store.decrypt_tokens(&integration) {
            Ok(tokens) => adapter.refresh_tokens(&integration, tokens.refresh_token.as_deref()).await,
            Err(err) => Err(err),
        };

        match refreshed {
            Ok(Some(tokens)) => self.store.rotate_tokens(integration_id, &tokens).await,
            Ok(None) => Ok(integration),
            Err(err) => {
                error!(
                    integration_id,
                    workspace_id = %integration.workspace_id,
                    provider = %integration.provider_type,
                    error = %err,
                    "integration.refresh_failed"
                );
                if let Err(mark_err) = self.store.mark_error(integration_id).await {
                    error!(integration_id, error = %mark_err, "integration.mark_error_failed");
                }
                Err(err)
            }
        }
    }

    /// Revoke upstream (best effort), delete, and announce the disconnect.
    pub async fn disconnect(&self, integration_id: &str) -> Result<Disconnected> {
        let integration = self.store.get(integration_id).await?;
        let revoked_upstream = self.revoke_upstream(&integration).await;

        self.store.delete(integration_id).await?;

        let event = DomainEvent::IntegrationDisconnected(IntegrationDisconnected {
            integration_id: integration.id.clone(),
            workspace_id: integration.workspace_id.clone(),
            integration_type: integration.provider_type,
            revoked_upstream,
            emitted_at: self.clock.now(),
        });
        self.publish(event).await;

        Ok(Disconnected { integration_id: integration.id, revoked_upstream })
    }

    async fn revoke_upstream(&self, integration: &Integration) -> bool {
        let attempt = async {
            let adapter = self.registry.get(integration.provider_type)?;
            let tokens = self.store.decrypt_tokens(integration)?;
            adapter.revoke_token(integration, &tokens.access_token).await
        };

        match attempt.await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    integration_id = %integration.id,
                    provider = %integration.provider_type,
                    error = %err,
                    "integration.revoke_failed"
                );
                false
            }
        }
    }

    async fn publish_connected(&self, integration: &Integration, user_id: &str) {
        let event = DomainEvent::IntegrationConnected(IntegrationConnected {
            integration_id: integration.id.clone(),
            workspace_id: integration.workspace_id.clone(),
            user_id: user_id.to_string(),
            integration_type: integration.provider_type,
            external_account_id: integration.external_account_id.clone(),
            external_account_name: integration.external_account_name.clone().unwrap_or_default(),
            external_organization_id: integration.external_organization_id.clone(),
            external_organization_name: integration.external_organization_name.clone(),
            emitted_at: self.clock.now(),
        });
        self.publish(event).await;
    }

    async fn publish(&self, event: DomainEvent) {
        let name = event.name();
        if let Err(err) = self.publisher.publish(event).await {
            error!(event = name, error = %err, "event.publish_failed");
        }
    }
}
