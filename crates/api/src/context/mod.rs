//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use relaygate_common::{Clock, SystemClock};
use relaygate_core::{
    CredentialVault, EventPublisher, IntegrationRepository, IntegrationStore, OAuthOrchestrator,
    OAuthStateStore, ProviderRegistry, StateManager, WebhookDeliveryRepository, WebhookIngestor,
};
use relaygate_domain::{GatewayConfig, Result};
use relaygate_infra::{
    build_provider_registry, webhook_secrets, BroadcastEventPublisher, DbManager, HttpClient,
    SqliteIntegrationRepository, SqliteOAuthStateStore, SqliteWebhookDeliveryRepository,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

/// Storage ports the services are built on.
pub struct Stores {
    pub integrations: Arc<dyn IntegrationRepository>,
    pub states: Arc<dyn OAuthStateStore>,
    pub deliveries: Arc<dyn WebhookDeliveryRepository>,
}

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: GatewayConfig,
    /// `None` when running on in-memory stores.
    pub db: Option<Arc<DbManager>>,
    pub registry: Arc<ProviderRegistry>,
    pub store: Arc<IntegrationStore>,
    pub states: Arc<StateManager>,
    pub orchestrator: Arc<OAuthOrchestrator>,
    pub ingestor: Arc<WebhookIngestor>,
    pub events: Arc<BroadcastEventPublisher>,
}

impl AppContext {
    /// Production wiring: SQLite stores, real provider adapters.
    ///
    /// Fails fast when the vault key is missing or the database cannot be
    /// opened and migrated.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;
        info!(path = %db.path().display(), "database.ready");

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let registry = build_provider_registry(&config.providers, HttpClient::new()?, Arc::clone(&clock));
        let stores = Stores {
            integrations: Arc::new(SqliteIntegrationRepository::new(Arc::clone(&db))),
            states: Arc::new(SqliteOAuthStateStore::new(Arc::clone(&db))),
            deliveries: Arc::new(SqliteWebhookDeliveryRepository::new(Arc::clone(&db))),
        };

        let mut ctx = Self::with_components(config, registry, stores, clock)?;
        ctx.db = Some(db);
        Ok(ctx)
    }

    /// Wire services over caller-supplied stores and adapters.
    pub fn with_components(
        config: GatewayConfig,
        registry: ProviderRegistry,
        stores: Stores,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let vault = Arc::new(CredentialVault::from_config(&config.vault)?);
        let registry = Arc::new(registry);
        let events = Arc::new(BroadcastEventPublisher::new());
        let publisher: Arc<dyn EventPublisher> = events.clone();

        let store = Arc::new(
            IntegrationStore::new(stores.integrations, vault).with_clock(Arc::clone(&clock)),
        );
        let states = Arc::new(StateManager::new(stores.states).with_clock(Arc::clone(&clock)));
        let orchestrator = Arc::new(
            OAuthOrchestrator::new(
                Arc::clone(&registry),
                Arc::clone(&states),
                Arc::clone(&store),
                Arc::clone(&publisher),
                config.app_url.clone(),
            )
            .with_clock(Arc::clone(&clock)),
        );
        let ingestor = Arc::new(
            WebhookIngestor::new(
                Arc::clone(&registry),
                Arc::clone(&store),
                stores.deliveries,
                publisher,
                webhook_secrets(&config.providers),
            )
            .with_clock(clock),
        );

        Ok(Self { config, db: None, registry, store, states, orchestrator, ingestor, events })
    }

    /// Component health for `GET /health`.
    pub fn health_check(&self) -> HealthStatus {
        let database = match &self.db {
            Some(db) => match db.health_check() {
                Ok(()) => ComponentHealth::healthy("database"),
                Err(err) => ComponentHealth::unhealthy("database", err.code()),
            },
            None => ComponentHealth::healthy("database").with_message("in-memory"),
        };

        let configured: Vec<&str> = self
            .registry
            .providers()
            .into_iter()
            .filter(|p| self.registry.get(*p).is_ok_and(|a| a.ensure_configured().is_ok()))
            .map(|p| p.slug())
            .collect();
        let providers = if configured.is_empty() {
            ComponentHealth::unhealthy("providers", "no provider is configured")
        } else {
            ComponentHealth::healthy("providers").with_message(configured.join(","))
        };

        let mut status = HealthStatus::new().add_component(database).add_component(providers);
        status.calculate_score();
        status
    }

    /// Periodically drop consumed and expired OAuth states.
    pub fn spawn_state_purge(&self, every: Duration) -> JoinHandle<()> {
        let states = Arc::clone(&self.states);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match states.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => info!(purged, "oauth.state.purged"),
                    Err(err) => warn!(error = %err, "oauth.state.purge_failed"),
                }
            }
        })
    }
}
